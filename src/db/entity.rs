pub mod car_table;
pub mod consumption_record;
pub mod new_plate;

pub use car_table::Model as CarRow;
pub use consumption_record::Model as ConsumptionRow;
pub use new_plate::Model as NewPlateRow;
