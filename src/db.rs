//! SeaORM-backed store.
//!
//! One `DbStore` per database. A host typically connects two of them: one to the local cache database, the other to
//! the central store, and hands them to [`Backends`](crate::service::Backends).

pub mod entity;
pub mod migrations;

use async_trait::async_trait;
use fieldx::fxstruct;
use sea_orm::sea_query::OnConflict;
use sea_orm::ColumnTrait;
use sea_orm::ConnectOptions;
use sea_orm::DatabaseConnection;
use sea_orm::EntityTrait;
use sea_orm::QueryFilter;
use sea_orm::TransactionTrait;
use sea_orm_migration::MigratorTrait;
use tracing::debug;
use tracing::instrument;

use crate::error::StoreError;
use crate::traits::BatchSink;
use crate::traits::PlateSource;
use crate::types::ConsumptionRecord;
use crate::types::PlateRecord;
use crate::types::UnrecognizedPlate;

use self::entity::car_table;
use self::entity::consumption_record;
use self::entity::new_plate;
use self::migrations::Migrator;

#[derive(Debug)]
#[fxstruct(sync, no_new)]
pub struct DbStore {
    connection: DatabaseConnection,
}

impl DbStore {
    pub async fn connect<O: Into<ConnectOptions>>(options: O) -> Result<Self, StoreError> {
        let options = options.into();
        let url = options.get_url().to_string();
        let connection = sea_orm::Database::connect(options)
            .await
            .map_err(|err| StoreError::Unavailable(format!("{url}: {err}")))?;
        Ok(Self { connection })
    }

    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    #[inline]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Create the `car_table`, `new_plate` and `consumption_record` tables where missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        Migrator::up(&self.connection, None).await?;
        Ok(())
    }

    async fn insert_all<A, E>(&self, kind: &'static str, rows: Vec<A>) -> Result<(), StoreError>
    where
        E: EntityTrait<ActiveModel = A>,
        A: sea_orm::ActiveModelTrait<Entity = E> + Send,
        E::Model: sea_orm::IntoActiveModel<A>,
    {
        let count = rows.len();
        let failed = |err: sea_orm::DbErr| StoreError::Insert {
            kind,
            count,
            message: err.to_string(),
        };

        let txn = self.connection.begin().await.map_err(failed)?;
        E::insert_many(rows)
            .exec_without_returning(&txn)
            .await
            .map_err(failed)?;
        txn.commit().await.map_err(failed)?;

        debug!("inserted {count} {kind} row(s)");
        Ok(())
    }
}

#[async_trait]
impl PlateSource for DbStore {
    #[instrument(level = "trace", skip(self))]
    async fn find_by_plate(&self, plate: &str) -> Result<Option<PlateRecord>, StoreError> {
        let row = car_table::Entity::find()
            .filter(car_table::Column::Plate.eq(plate))
            .one(&self.connection)
            .await
            .map_err(|err| StoreError::Query {
                plate:   plate.to_string(),
                message: err.to_string(),
            })?;
        Ok(row.map(PlateRecord::from))
    }
}

#[async_trait]
impl BatchSink<PlateRecord> for DbStore {
    async fn batch_insert(&self, records: Vec<PlateRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let count = records.len();
        let failed = |err: sea_orm::DbErr| StoreError::Insert {
            kind: "car",
            count,
            message: err.to_string(),
        };

        // A plate already cached by another refill is skipped, not an error.
        let rows = records.into_iter().map(car_table::ActiveModel::from);
        let txn = self.connection.begin().await.map_err(failed)?;
        car_table::Entity::insert_many(rows)
            .on_conflict(OnConflict::column(car_table::Column::Plate).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await
            .map_err(failed)?;
        txn.commit().await.map_err(failed)?;

        debug!("refilled {count} car row(s)");
        Ok(())
    }
}

#[async_trait]
impl BatchSink<UnrecognizedPlate> for DbStore {
    async fn batch_insert(&self, records: Vec<UnrecognizedPlate>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let rows = records.into_iter().map(new_plate::ActiveModel::from).collect();
        self.insert_all::<_, new_plate::Entity>("new plate", rows).await
    }
}

#[async_trait]
impl BatchSink<ConsumptionRecord> for DbStore {
    async fn batch_insert(&self, records: Vec<ConsumptionRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let rows = records.into_iter().map(consumption_record::ActiveModel::from).collect();
        self.insert_all::<_, consumption_record::Entity>("consumption", rows).await
    }
}
