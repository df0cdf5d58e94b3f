use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "consumption_record_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ConsumptionRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConsumptionRecord::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ConsumptionRecord::Plate).string().not_null())
                    .col(ColumnDef::new(ConsumptionRecord::VehicleType).string().not_null())
                    .col(ColumnDef::new(ConsumptionRecord::CompanyCode).string().not_null())
                    .col(ColumnDef::new(ConsumptionRecord::PlazaCode).string().not_null())
                    .col(ColumnDef::new(ConsumptionRecord::LaneNumber).string().not_null())
                    .col(ColumnDef::new(ConsumptionRecord::Amount).big_integer().not_null())
                    .col(ColumnDef::new(ConsumptionRecord::RecordedAt).date_time().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ConsumptionRecord::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ConsumptionRecord {
    Table,
    Id,
    Plate,
    VehicleType,
    CompanyCode,
    PlazaCode,
    LaneNumber,
    Amount,
    RecordedAt,
}
