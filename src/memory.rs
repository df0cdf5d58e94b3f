//! In-process store.
//!
//! Plate records live in a [moka](https://crates.io/crates/moka) cache, so a `MemoryStore` can stand in for the local
//! cache of a host without a database. Every batch it accepts is also kept verbatim for inspection, and both queries
//! and inserts can be switched to fail on demand.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::StoreError;
use crate::traits::BatchSink;
use crate::traits::PlateSource;
use crate::types::ConsumptionRecord;
use crate::types::PlateRecord;
use crate::types::UnrecognizedPlate;

pub const DEFAULT_MAX_CAPACITY: u64 = 100_000;

pub struct MemoryStore {
    name:         &'static str,
    plates:       Cache<String, PlateRecord>,
    refills:      Mutex<Vec<Vec<PlateRecord>>>,
    unrecognized: Mutex<Vec<Vec<UnrecognizedPlate>>>,
    consumption:  Mutex<Vec<Vec<ConsumptionRecord>>>,
    queries:      AtomicUsize,
    fail_queries: AtomicBool,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(name: &'static str, max_capacity: u64) -> Self {
        Self {
            name,
            plates: Cache::builder()
                .max_capacity(max_capacity)
                .name(name)
                .eviction_policy(EvictionPolicy::tiny_lfu())
                .build(),
            refills: Mutex::new(Vec::new()),
            unrecognized: Mutex::new(Vec::new()),
            consumption: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
            fail_queries: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Put records in directly, bypassing the batch bookkeeping.
    pub async fn seed<I>(&self, records: I)
    where
        I: IntoIterator<Item = PlateRecord>,
    {
        for record in records {
            self.plates.insert(record.plate.clone(), record).await;
        }
    }

    pub async fn contains(&self, plate: &str) -> bool {
        self.plates.get(plate).await.is_some()
    }

    /// Number of point lookups served so far, failed ones included.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::Relaxed);
    }

    pub fn refill_batches(&self) -> Vec<Vec<PlateRecord>> {
        self.refills.lock().clone()
    }

    pub fn unrecognized_batches(&self) -> Vec<Vec<UnrecognizedPlate>> {
        self.unrecognized.lock().clone()
    }

    pub fn consumption_batches(&self) -> Vec<Vec<ConsumptionRecord>> {
        self.consumption.lock().clone()
    }

    fn check_insert(&self, kind: &'static str, count: usize) -> Result<(), StoreError> {
        if self.fail_inserts.load(Ordering::Relaxed) {
            return Err(StoreError::Insert {
                kind,
                count,
                message: format!("{} rejects inserts", self.name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlateSource for MemoryStore {
    async fn find_by_plate(&self, plate: &str) -> Result<Option<PlateRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if self.fail_queries.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(self.name.to_string()));
        }
        Ok(self.plates.get(plate).await)
    }
}

#[async_trait]
impl BatchSink<PlateRecord> for MemoryStore {
    async fn batch_insert(&self, records: Vec<PlateRecord>) -> Result<(), StoreError> {
        self.check_insert("car", records.len())?;
        trace!("[{}] refilling {} plate(s)", self.name, records.len());
        for record in &records {
            // First write wins, same as the unique plate column of a real table.
            if self.plates.get(record.plate.as_str()).await.is_none() {
                self.plates.insert(record.plate.clone(), record.clone()).await;
            }
        }
        self.refills.lock().push(records);
        Ok(())
    }
}

#[async_trait]
impl BatchSink<UnrecognizedPlate> for MemoryStore {
    async fn batch_insert(&self, records: Vec<UnrecognizedPlate>) -> Result<(), StoreError> {
        self.check_insert("new plate", records.len())?;
        self.unrecognized.lock().push(records);
        Ok(())
    }
}

#[async_trait]
impl BatchSink<ConsumptionRecord> for MemoryStore {
    async fn batch_insert(&self, records: Vec<ConsumptionRecord>) -> Result<(), StoreError> {
        self.check_insert("consumption", records.len())?;
        self.consumption.lock().push(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_plates_are_found() {
        let store = MemoryStore::new("local");
        store.seed([PlateRecord::new("川A12345")]).await;

        let found = store.find_by_plate("川A12345").await.unwrap();
        assert_eq!(found.map(|r| r.plate), Some("川A12345".to_string()));
        assert!(store.find_by_plate("川A99999").await.unwrap().is_none());
        assert_eq!(store.query_count(), 2);
    }

    #[tokio::test]
    async fn refill_does_not_overwrite() {
        let store = MemoryStore::new("local");
        let mut original = PlateRecord::new("川A12345");
        original.master = "first".into();
        store.seed([original.clone()]).await;

        let mut newer = original.clone();
        newer.master = "second".into();
        BatchSink::<PlateRecord>::batch_insert(&store, vec![newer, PlateRecord::new("川B22222")])
            .await
            .unwrap();

        assert_eq!(store.find_by_plate("川A12345").await.unwrap(), Some(original));
        assert!(store.contains("川B22222").await);
        assert_eq!(store.refill_batches().len(), 1);
    }

    #[tokio::test]
    async fn failure_modes() {
        let store = MemoryStore::new("flaky");
        store.set_fail_queries(true);
        assert!(matches!(
            store.find_by_plate("川A12345").await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_fail_inserts(true);
        let err = BatchSink::<ConsumptionRecord>::batch_insert(&store, vec![ConsumptionRecord::default()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 consumption record(s)"));
        assert!(store.consumption_batches().is_empty());
    }
}
