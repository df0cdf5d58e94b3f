//! Background write-behind of staged records.
//!
//! A [`BatchFlushWorker`] owns the consuming side of one [`StagingSlotBuffer`]. On every tick it counts the ready
//! slots and flushes them in a single batch insert once either there are at least `min_batch` of them, or
//! `max_wait_ticks` ticks went by since the last flush. A failed insert is logged and the batch is dropped: the slots
//! are recycled regardless. Losing records during a store outage is the price for never running out of slots and
//! never pushing back on the lookup path.

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use fieldx::fxstruct;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;

use crate::control::RunControl;
use crate::staging::SlotId;
use crate::staging::StagingSlotBuffer;
use crate::traits::BatchSink;

pub const DEFAULT_MIN_BATCH: usize = 10;
pub const DEFAULT_MAX_WAIT_TICKS: u32 = 5;
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// When to flush. The defaults are what a production host runs with.
#[derive(Debug, Clone)]
#[fxstruct(no_new, builder, get(copy))]
pub struct FlushPolicy {
    #[fieldx(default(DEFAULT_MIN_BATCH))]
    min_batch:      usize,
    #[fieldx(default(DEFAULT_MAX_WAIT_TICKS))]
    max_wait_ticks: u32,
    /// Pause between two consecutive scans.
    #[fieldx(default(DEFAULT_TICK))]
    tick:           Duration,
}

impl FlushPolicy {
    pub fn standard() -> Self {
        Self::builder()
            .build()
            .expect("every flush policy field has a default")
    }
}

pub struct BatchFlushWorker<R>
where
    R: Send + 'static,
{
    buffer:     Arc<StagingSlotBuffer<R>>,
    sink:       Arc<dyn BatchSink<R>>,
    policy:     FlushPolicy,
    idle_ticks: AtomicU32,
    control:    RunControl,
}

impl<R> BatchFlushWorker<R>
where
    R: Send + 'static,
{
    pub fn new(buffer: Arc<StagingSlotBuffer<R>>, sink: Arc<dyn BatchSink<R>>, policy: FlushPolicy) -> Self {
        Self {
            buffer,
            sink,
            policy,
            idle_ticks: AtomicU32::new(0),
            control: RunControl::default(),
        }
    }

    #[inline]
    pub fn buffer(&self) -> &Arc<StagingSlotBuffer<R>> {
        &self.buffer
    }

    #[inline]
    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Ticks elapsed since the last flush.
    #[inline]
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks.load(Ordering::Acquire)
    }

    /// Spawn the flush loop. Starting a running flusher does nothing. After a restart the new loop begins its first
    /// tick only once the previous loop is done with its last one.
    pub fn start(self: &Arc<Self>) {
        let Some(epoch) = self.control.begin()
        else {
            return;
        };
        let myself = Arc::clone(self);
        tokio::spawn(async move { myself.flush_loop(epoch).await });
    }

    /// Stop scheduling further ticks. Whatever is staged stays staged; an insert already in flight completes.
    pub fn stop(&self) {
        if self.control.halt() {
            debug!("[{}] flusher stop requested", self.buffer.name());
        }
    }

    /// Stop, wait for the loop to exit, then flush everything that is ready in one last batch.
    pub async fn close(&self) -> usize {
        self.stop();
        let _turn = self.control.turn().await;
        let ready = self.buffer.ready_slots();
        if ready.is_empty() {
            return 0;
        }
        self.flush_slots(&ready).await
    }

    async fn flush_loop(&self, epoch: u64) {
        let _turn = self.control.turn().await;
        info!("[{}] flusher started", self.buffer.name());
        while self.control.is_current(epoch) {
            self.run_tick().await;
            tokio::time::sleep(self.policy.tick()).await;
        }
        info!("[{}] flusher stopped", self.buffer.name());
    }

    /// One scan of the buffer. Returns the number of records handed to the store.
    #[instrument(level = "trace", skip(self), fields(buffer = self.buffer.name()))]
    pub async fn run_tick(&self) -> usize {
        let ready = self.buffer.ready_slots();

        if ready.len() >= self.policy.min_batch() || self.idle_ticks() >= self.policy.max_wait_ticks() {
            self.idle_ticks.store(0, Ordering::Release);
            if ready.is_empty() {
                return 0;
            }
            self.flush_slots(&ready).await
        }
        else {
            self.idle_ticks.fetch_add(1, Ordering::AcqRel);
            0
        }
    }

    async fn flush_slots(&self, ids: &[SlotId]) -> usize {
        let (claimed, records) = self.buffer.take_ready(ids);
        let count = records.len();

        if count > 0 {
            match self.sink.batch_insert(records).await {
                Ok(()) => debug!("[{}] flushed {count} record(s)", self.buffer.name()),
                Err(err) => error!("[{}] dropping batch of {count} record(s): {err}", self.buffer.name()),
            }
        }

        // Recycled whatever the outcome of the insert.
        self.buffer.recycle(&claimed);
        count
    }
}
