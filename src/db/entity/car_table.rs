use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

use crate::types::PlateRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "car_table")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:            i32,
    #[sea_orm(unique, indexed)]
    pub plate:         String,
    pub vehicle_class: String,
    pub vehicle_type:  String,
    pub num:           String,
    pub remark:        String,
    pub unit:          String,
    pub master:        String,
    pub monitor_level: String,
    pub sms_report:    bool,
    pub comment:       String,
    pub timestamp:     Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PlateRecord {
    fn from(row: Model) -> Self {
        Self {
            plate:         row.plate,
            vehicle_class: row.vehicle_class,
            vehicle_type:  row.vehicle_type,
            num:           row.num,
            remark:        row.remark,
            unit:          row.unit,
            master:        row.master,
            monitor_level: row.monitor_level,
            sms_report:    row.sms_report,
            comment:       row.comment,
            timestamp:     row.timestamp,
        }
    }
}

impl From<PlateRecord> for ActiveModel {
    fn from(record: PlateRecord) -> Self {
        Self {
            plate: Set(record.plate),
            vehicle_class: Set(record.vehicle_class),
            vehicle_type: Set(record.vehicle_type),
            num: Set(record.num),
            remark: Set(record.remark),
            unit: Set(record.unit),
            master: Set(record.master),
            monitor_level: Set(record.monitor_level),
            sms_report: Set(record.sms_report),
            comment: Set(record.comment),
            timestamp: Set(record.timestamp),
            ..Default::default()
        }
    }
}
