//! Persistence of consumption records.
//!
//! Producers already hand over whole batches, so there is nothing to coalesce: batches wait in a bounded FIFO and the
//! drain loop inserts each one as soon as it is dequeued. The queue refuses new batches when full instead of blocking
//! the producer or growing without bound.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::queue::ArrayQueue;
use fieldx::fxstruct;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;

use crate::control::RunControl;
use crate::error::QueueError;
use crate::traits::BatchSink;
use crate::types::ConsumptionRecord;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
#[fxstruct(no_new, builder, get(copy))]
pub struct ConsumptionQueuePolicy {
    /// Maximum number of batches waiting for insertion.
    #[fieldx(default(DEFAULT_QUEUE_CAPACITY))]
    capacity:      usize,
    /// How long the drain loop sleeps when it finds the queue empty.
    #[fieldx(default(DEFAULT_IDLE_INTERVAL))]
    idle_interval: Duration,
}

impl ConsumptionQueuePolicy {
    pub fn standard() -> Self {
        Self::builder()
            .build()
            .expect("every consumption queue policy field has a default")
    }
}

pub struct ConsumptionRecordWriter<R = ConsumptionRecord>
where
    R: Send + 'static,
{
    queue:   ArrayQueue<Vec<R>>,
    sink:    Arc<dyn BatchSink<R>>,
    policy:  ConsumptionQueuePolicy,
    control: RunControl,
}

impl<R> ConsumptionRecordWriter<R>
where
    R: Send + 'static,
{
    pub fn new(sink: Arc<dyn BatchSink<R>>, policy: ConsumptionQueuePolicy) -> Self {
        Self {
            queue: ArrayQueue::new(policy.capacity().max(1)),
            sink,
            policy,
            control: RunControl::default(),
        }
    }

    /// Queue a batch for insertion. Fails fast when the queue is full.
    pub fn submit(&self, records: Vec<R>) -> Result<(), QueueError> {
        if records.is_empty() {
            return Err(QueueError::EmptyBatch);
        }
        self.queue.push(records).map_err(|_| QueueError::Full)
    }

    /// Batches waiting for insertion.
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    pub fn start(self: &Arc<Self>) {
        let Some(epoch) = self.control.begin()
        else {
            return;
        };
        let myself = Arc::clone(self);
        tokio::spawn(async move { myself.drain_loop(epoch).await });
    }

    /// Stop draining. Queued batches stay queued.
    pub fn stop(&self) {
        if self.control.halt() {
            debug!("consumption record writer stop requested");
        }
    }

    /// Stop, wait for the drain loop to finish the insert it may be running, then insert whatever is still queued.
    /// Returns the number of batches inserted by this call.
    pub async fn close(&self) -> usize {
        self.stop();
        let _turn = self.control.turn().await;
        self.drain().await
    }

    async fn drain_loop(&self, epoch: u64) {
        let _turn = self.control.turn().await;
        info!("consumption record writer started");
        while self.control.is_current(epoch) {
            while self.control.is_current(epoch) {
                let Some(batch) = self.queue.pop()
                else {
                    break;
                };
                self.insert(batch).await;
            }
            tokio::time::sleep(self.policy.idle_interval()).await;
        }
        info!("consumption record writer stopped");
    }

    /// Insert every queued batch right away, one insert per batch. Returns the number of batches processed.
    pub async fn drain(&self) -> usize {
        let mut batches = 0;
        while let Some(batch) = self.queue.pop() {
            self.insert(batch).await;
            batches += 1;
        }
        batches
    }

    #[instrument(level = "trace", skip_all, fields(records = batch.len()))]
    async fn insert(&self, batch: Vec<R>) {
        let count = batch.len();
        match self.sink.batch_insert(batch).await {
            Ok(()) => debug!("inserted {count} consumption record(s)"),
            Err(err) => error!("failed to insert {count} consumption record(s): {err}"),
        }
    }
}
