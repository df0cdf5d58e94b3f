use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

use crate::types::UnrecognizedPlate;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "new_plate")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:           i32,
    #[sea_orm(indexed)]
    pub plate:        String,
    pub vehicle_type: String,
    pub company_code: String,
    pub plaza_code:   String,
    pub lane_name:    String,
    pub lane_number:  String,
    pub staged_at:    NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<UnrecognizedPlate> for ActiveModel {
    fn from(entry: UnrecognizedPlate) -> Self {
        Self {
            plate: Set(entry.plate),
            vehicle_type: Set(entry.vehicle_type),
            company_code: Set(entry.company_code),
            plaza_code: Set(entry.plaza_code),
            lane_name: Set(entry.lane_name),
            lane_number: Set(entry.lane_number),
            staged_at: Set(entry.staged_at),
            ..Default::default()
        }
    }
}
