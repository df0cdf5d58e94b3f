use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

use crate::types::ConsumptionRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "consumption_record")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:           i32,
    pub plate:        String,
    pub vehicle_type: String,
    pub company_code: String,
    pub plaza_code:   String,
    pub lane_number:  String,
    // Cents.
    pub amount:       i64,
    pub recorded_at:  Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<ConsumptionRecord> for ActiveModel {
    fn from(record: ConsumptionRecord) -> Self {
        Self {
            plate: Set(record.plate),
            vehicle_type: Set(record.vehicle_type),
            company_code: Set(record.company_code),
            plaza_code: Set(record.plaza_code),
            lane_number: Set(record.lane_number),
            amount: Set(record.amount),
            recorded_at: Set(record.recorded_at),
            ..Default::default()
        }
    }
}
