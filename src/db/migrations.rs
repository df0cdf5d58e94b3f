pub mod car_table;
pub mod consumption_record;
pub mod new_plate;

use sea_orm_migration::prelude::*;

pub struct Migrator;

impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(car_table::Migration),
            Box::new(new_plate::Migration),
            Box::new(consumption_record::Migration),
        ]
    }
}
