//! Wiring of every component into one running service.

use std::sync::Arc;

use fieldx::fxstruct;
use tracing::info;

use crate::consumption::ConsumptionQueuePolicy;
use crate::consumption::ConsumptionRecordWriter;
use crate::error::PoolError;
use crate::error::QueueError;
use crate::error::ServiceError;
use crate::flush::BatchFlushWorker;
use crate::flush::FlushPolicy;
use crate::lookup::LookupContext;
use crate::lookup::DEFAULT_HOME_REGION;
use crate::pool::LookupWorkerPool;
use crate::pool::DEFAULT_WORKERS;
use crate::staging::StagingSlotBuffer;
use crate::staging::DEFAULT_SLOTS;
use crate::traits::BatchSink;
use crate::traits::LookupObserver;
use crate::traits::PlateSource;
use crate::types::ConsumptionRecord;
use crate::types::LookupTask;
use crate::types::PlateRecord;
use crate::types::UnrecognizedPlate;

/// Sizing of a [`PlateService`]. Out-of-range worker and slot counts fall back to their defaults when the service is
/// assembled, not here.
#[derive(Debug, Clone)]
#[fxstruct(no_new, builder, get(copy))]
pub struct ServiceConfig {
    #[fieldx(default(DEFAULT_WORKERS))]
    workers:            usize,
    #[fieldx(default(DEFAULT_SLOTS))]
    car_slots:          usize,
    #[fieldx(default(DEFAULT_SLOTS))]
    new_plate_slots:    usize,
    #[fieldx(get(clone), builder(into), default(String::from(DEFAULT_HOME_REGION)))]
    home_region:        String,
    #[fieldx(get(clone), default(FlushPolicy::standard()))]
    flush_policy:       FlushPolicy,
    #[fieldx(get(clone), default(ConsumptionQueuePolicy::standard()))]
    consumption_policy: ConsumptionQueuePolicy,
}

impl ServiceConfig {
    pub fn standard() -> Self {
        Self::builder()
            .build()
            .expect("every service config field has a default")
    }
}

/// The stores a service talks to.
pub struct Backends {
    /// The local cache.
    pub cache:            Arc<dyn PlateSource>,
    pub central:          Arc<dyn PlateSource>,
    /// Receives central store hits, i.e. the local cache refill.
    pub car_sink:         Arc<dyn BatchSink<PlateRecord>>,
    pub new_plate_sink:   Arc<dyn BatchSink<UnrecognizedPlate>>,
    pub consumption_sink: Arc<dyn BatchSink<ConsumptionRecord>>,
    pub observer:         Option<Arc<dyn LookupObserver>>,
}

impl Backends {
    /// The common layout: one local store serving the lookups and taking all three kinds of inserts.
    pub fn local<S>(local: Arc<S>, central: Arc<dyn PlateSource>) -> Self
    where
        S: PlateSource + BatchSink<PlateRecord> + BatchSink<UnrecognizedPlate> + BatchSink<ConsumptionRecord>,
    {
        Self {
            cache: local.clone(),
            central,
            car_sink: local.clone(),
            new_plate_sink: local.clone(),
            consumption_sink: local,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LookupObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

pub struct PlateService {
    context:           Arc<LookupContext>,
    pool:              LookupWorkerPool,
    car_flusher:       Arc<BatchFlushWorker<PlateRecord>>,
    new_plate_flusher: Arc<BatchFlushWorker<UnrecognizedPlate>>,
    consumption:       Arc<ConsumptionRecordWriter<ConsumptionRecord>>,
}

impl PlateService {
    /// Build every component. Nothing runs until [`start`](Self::start).
    pub fn assemble(config: &ServiceConfig, backends: Backends) -> Result<Self, ServiceError> {
        let car_staging = Arc::new(StagingSlotBuffer::new("car_table", config.car_slots()));
        let new_plate_staging = Arc::new(StagingSlotBuffer::new("new_plate", config.new_plate_slots()));

        let context = Arc::new(
            LookupContext::builder()
                .cache(backends.cache)
                .central(backends.central)
                .car_staging(car_staging.clone())
                .new_plate_staging(new_plate_staging.clone())
                .home_region(config.home_region())
                .build()
                .map_err(|err| ServiceError::Context(err.to_string()))?,
        );

        let pool = LookupWorkerPool::new(config.workers(), context.clone(), backends.observer);
        let car_flusher = Arc::new(BatchFlushWorker::new(
            car_staging,
            backends.car_sink,
            config.flush_policy(),
        ));
        let new_plate_flusher = Arc::new(BatchFlushWorker::new(
            new_plate_staging,
            backends.new_plate_sink,
            config.flush_policy(),
        ));
        let consumption = Arc::new(ConsumptionRecordWriter::new(
            backends.consumption_sink,
            config.consumption_policy(),
        ));

        Ok(Self {
            context,
            pool,
            car_flusher,
            new_plate_flusher,
            consumption,
        })
    }

    pub fn start(&self) {
        self.car_flusher.start();
        self.new_plate_flusher.start();
        self.consumption.start();
        self.pool.start();
        info!("plate service started with {} lookup worker(s)", self.pool.worker_count());
    }

    /// Stop every loop. Staged records and queued tasks stay where they are.
    pub fn stop(&self) {
        self.pool.stop();
        self.car_flusher.stop();
        self.new_plate_flusher.stop();
        self.consumption.stop();
        info!("plate service stopped");
    }

    /// Stop, then push out everything already staged or queued for insertion.
    pub async fn close(&self) {
        self.pool.stop();
        self.consumption.stop();
        let refilled = self.car_flusher.close().await;
        let unrecognized = self.new_plate_flusher.close().await;
        let batches = self.consumption.close().await;
        info!(
            "plate service closed; final flush: {refilled} refill(s), {unrecognized} unrecognized plate(s), {batches} \
             consumption batch(es)"
        );
    }

    pub fn submit(&self, index: usize, task: LookupTask) -> Result<(), PoolError> {
        self.pool.submit(index, task)
    }

    pub fn submit_consumption(&self, batch: Vec<ConsumptionRecord>) -> Result<(), QueueError> {
        self.consumption.submit(batch)
    }

    pub fn context(&self) -> &Arc<LookupContext> {
        &self.context
    }

    pub fn pool(&self) -> &LookupWorkerPool {
        &self.pool
    }

    pub fn car_flusher(&self) -> &Arc<BatchFlushWorker<PlateRecord>> {
        &self.car_flusher
    }

    pub fn new_plate_flusher(&self) -> &Arc<BatchFlushWorker<UnrecognizedPlate>> {
        &self.new_plate_flusher
    }

    pub fn consumption(&self) -> &Arc<ConsumptionRecordWriter<ConsumptionRecord>> {
        &self.consumption
    }
}
