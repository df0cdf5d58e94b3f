//! Lookup workers, each with a private task queue.
//!
//! The pool does no load balancing. A submitter picks the worker by index and owns the consequences of an uneven
//! assignment; tasks given to one worker run strictly in submission order.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::queue::SegQueue;
use tracing::debug;
use tracing::info;

use crate::control::RunControl;
use crate::error::PoolError;
use crate::lookup::LookupContext;
use crate::traits::LookupObserver;
use crate::types::LookupTask;

pub const DEFAULT_WORKERS: usize = 10;
pub const MAX_WORKERS: usize = 20;
/// How long an idle worker sleeps before looking at its queue again.
pub const IDLE_POLL: Duration = Duration::from_millis(10);

pub struct LookupWorker {
    index:    usize,
    queue:    SegQueue<LookupTask>,
    context:  Arc<LookupContext>,
    observer: Option<Arc<dyn LookupObserver>>,
    control:  RunControl,
}

impl LookupWorker {
    pub fn new(index: usize, context: Arc<LookupContext>, observer: Option<Arc<dyn LookupObserver>>) -> Self {
        Self {
            index,
            queue: SegQueue::new(),
            context,
            observer,
            control: RunControl::default(),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Queue a task. Always accepted, even while the worker is stopped.
    pub fn submit(&self, task: LookupTask) {
        self.queue.push(task);
    }

    /// Tasks queued but not yet picked up.
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
        tokio::spawn(async move { myself.work_loop(epoch).await });
    }

    /// Ask the worker to quit after the task it is running, if any. Queued tasks are not drained and their responders
    /// will not fire unless the worker is started again.
    pub fn stop(&self) {
        if self.control.halt() {
            debug!("lookup worker {} stop requested", self.index);
        }
    }

    // Restarting while a task is still being resolved must not let two loops pop from the same queue.
    async fn work_loop(&self, epoch: u64) {
        let _turn = self.control.turn().await;
        info!("lookup worker {} started", self.index);
        while self.control.is_current(epoch) {
            while self.control.is_current(epoch) {
                let Some(task) = self.queue.pop()
                else {
                    break;
                };
                self.process(task).await;
            }
            tokio::time::sleep(IDLE_POLL).await;
        }
        info!("lookup worker {} stopped", self.index);
    }

    /// Run one task to completion: resolve, respond, then notify the observer.
    pub async fn process(&self, task: LookupTask) {
        let response = self
            .context
            .resolve(&task.plate, &task.vehicle_type, &task.station)
            .await;

        let plate = task.plate.clone();
        debug!(
            "worker {} answering '{plate}': found={}, error='{}'",
            self.index,
            response.found(),
            response.error()
        );

        match self.observer {
            Some(ref observer) => {
                task.respond(response.clone());
                observer.on_lookup_complete(self.index, &plate, &response).await;
            }
            None => task.respond(response),
        }
    }
}

pub struct LookupWorkerPool {
    workers: Vec<Arc<LookupWorker>>,
}

impl LookupWorkerPool {
    /// Create `thread_nums` workers sharing one lookup context. Zero or more than [`MAX_WORKERS`] silently falls back
    /// to [`DEFAULT_WORKERS`].
    pub fn new(thread_nums: usize, context: Arc<LookupContext>, observer: Option<Arc<dyn LookupObserver>>) -> Self {
        let count = if thread_nums == 0 || thread_nums > MAX_WORKERS {
            DEFAULT_WORKERS
        }
        else {
            thread_nums
        };

        let workers = (0..count)
            .map(|index| Arc::new(LookupWorker::new(index, Arc::clone(&context), observer.clone())))
            .collect();

        Self { workers }
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn worker(&self, index: usize) -> Option<&Arc<LookupWorker>> {
        self.workers.get(index)
    }

    /// Hand `task` to the worker at `index`. On an unknown index the task is dropped without its responder firing.
    pub fn submit(&self, index: usize, task: LookupTask) -> Result<(), PoolError> {
        let worker = self.worker(index).ok_or(PoolError::UnknownWorker {
            index,
            count: self.worker_count(),
        })?;
        worker.submit(task);
        Ok(())
    }

    pub fn start(&self) {
        for worker in &self.workers {
            worker.start();
        }
    }

    pub fn stop(&self) {
        for worker in &self.workers {
            worker.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.workers.iter().any(|w| w.is_running())
    }
}
