use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "car_table_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CarTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CarTable::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CarTable::Plate).string().not_null())
                    .col(ColumnDef::new(CarTable::VehicleClass).string().not_null())
                    .col(ColumnDef::new(CarTable::VehicleType).string().not_null())
                    .col(ColumnDef::new(CarTable::Num).string().not_null())
                    .col(ColumnDef::new(CarTable::Remark).string().not_null())
                    .col(ColumnDef::new(CarTable::Unit).string().not_null())
                    .col(ColumnDef::new(CarTable::Master).string().not_null())
                    .col(ColumnDef::new(CarTable::MonitorLevel).string().not_null())
                    .col(ColumnDef::new(CarTable::SmsReport).boolean().not_null())
                    .col(ColumnDef::new(CarTable::Comment).string().not_null())
                    .col(ColumnDef::new(CarTable::Timestamp).date_time().null())
                    .index(Index::create().name("idx-unique-plate").col(CarTable::Plate).unique())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CarTable::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum CarTable {
    Table,
    Id,
    Plate,
    VehicleClass,
    VehicleType,
    Num,
    Remark,
    Unit,
    Master,
    MonitorLevel,
    SmsReport,
    Comment,
    Timestamp,
}
