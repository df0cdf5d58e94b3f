use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "new_plate_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NewPlate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NewPlate::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NewPlate::Plate).string().not_null())
                    .col(ColumnDef::new(NewPlate::VehicleType).string().not_null())
                    .col(ColumnDef::new(NewPlate::CompanyCode).string().not_null())
                    .col(ColumnDef::new(NewPlate::PlazaCode).string().not_null())
                    .col(ColumnDef::new(NewPlate::LaneName).string().not_null())
                    .col(ColumnDef::new(NewPlate::LaneNumber).string().not_null())
                    .col(ColumnDef::new(NewPlate::StagedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        // Review happens per plate, and the same plate tends to show up many times before it is registered.
        manager
            .create_index(
                Index::create()
                    .name("idx-new-plate-plate")
                    .table(NewPlate::Table)
                    .col(NewPlate::Plate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NewPlate::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum NewPlate {
    Table,
    Id,
    Plate,
    VehicleType,
    CompanyCode,
    PlazaCode,
    LaneName,
    LaneNumber,
    StagedAt,
}
