use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use plate_lookup::prelude::*;

fn station() -> StationDescriptor {
    StationDescriptor {
        company_code: "SC01".into(),
        plaza_code:   "0042".into(),
        lane_name:    "Exit 2".into(),
        lane_number:  "2".into(),
    }
}

struct Rig {
    local:   Arc<MemoryStore>,
    central: Arc<MemoryStore>,
    service: PlateService,
}

async fn rig(backends: impl FnOnce(Backends) -> Backends) -> Rig {
    let local = Arc::new(MemoryStore::new("local"));
    let central = Arc::new(MemoryStore::new("central"));

    let mut registered = PlateRecord::new("川B00001");
    registered.vehicle_class = "1".into();
    registered.unit = "Chengdu Logistics".into();
    central.seed([registered]).await;

    let config = ServiceConfig::builder().workers(4).build().unwrap();
    let service = PlateService::assemble(&config, backends(Backends::local(local.clone(), central.clone()))).unwrap();
    service.start();

    Rig {
        local,
        central,
        service,
    }
}

async fn ask(service: &PlateService, worker: usize, plate: &str) -> (bool, Option<PlateRecord>, String) {
    let (responder, rx) = oneshot_responder();
    service
        .submit(worker, LookupTask::new(plate, "1", station(), responder))
        .unwrap();
    rx.await.unwrap().into_parts()
}

#[tokio::test(start_paused = true)]
async fn unknown_home_plate_is_staged_for_review() {
    let rig = rig(|b| b).await;

    let (found, record, error) = ask(&rig.service, 0, "川A12345").await;
    assert!(!found);
    assert!(record.is_none());
    assert_eq!(error, "no record found");
    assert_eq!(rig.central.query_count(), 1);

    // Below min_batch, so it goes out on the max-wait timeout.
    tokio::time::sleep(Duration::from_secs(7)).await;
    let batches = rig.local.unrecognized_batches();
    assert_eq!(batches.len(), 1);
    let entry = &batches[0][0];
    assert_eq!(entry.plate, "川A12345");
    assert_eq!(entry.vehicle_type, "1");
    assert_eq!(entry.company_code, "SC01");
    assert_eq!(entry.plaza_code, "0042");
    assert_eq!(entry.lane_number, "2");
    assert!(rig.local.refill_batches().is_empty());

    rig.service.stop();
}

#[tokio::test(start_paused = true)]
async fn central_hit_refills_local_cache() {
    let rig = rig(|b| b).await;

    let (found, record, error) = ask(&rig.service, 1, "川B00001").await;
    assert!(found);
    assert_eq!(record.map(|r| r.unit), Some("Chengdu Logistics".to_string()));
    assert!(error.is_empty());
    assert!(!rig.local.contains("川B00001").await);

    tokio::time::sleep(Duration::from_secs(7)).await;
    assert!(rig.local.contains("川B00001").await);

    // Served locally from now on.
    let (found, _, _) = ask(&rig.service, 2, "川B00001").await;
    assert!(found);
    assert_eq!(rig.central.query_count(), 1);

    rig.service.stop();
}

#[tokio::test(start_paused = true)]
async fn out_of_region_plate_never_reaches_central() {
    let rig = rig(|b| b).await;

    let (found, _, error) = ask(&rig.service, 3, "京A11111").await;
    assert!(!found);
    assert_eq!(error, "no record found");
    assert_eq!(rig.central.query_count(), 0);

    rig.service.close().await;
    assert_eq!(rig.local.unrecognized_batches().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn local_cache_failure_is_reported_not_treated_as_miss() {
    let rig = rig(|b| b).await;
    rig.local.set_fail_queries(true);

    let (found, record, error) = ask(&rig.service, 0, "川B00001").await;
    assert!(!found);
    assert!(record.is_none());
    assert_eq!(error, "store 'local' is unavailable");
    assert_eq!(rig.central.query_count(), 0);

    rig.service.close().await;
    assert!(rig.local.unrecognized_batches().is_empty());
    assert!(rig.local.refill_batches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn consumption_batches_are_persisted() {
    let rig = rig(|b| b).await;

    let record = ConsumptionRecord {
        plate: "川A12345".into(),
        amount: 1500,
        ..Default::default()
    };
    rig.service
        .submit_consumption(vec![record.clone(), record.clone()])
        .unwrap();
    assert_eq!(rig.service.submit_consumption(vec![]), Err(QueueError::EmptyBatch));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(rig.local.consumption_batches(), vec![vec![record.clone(), record]]);

    rig.service.stop();
}

#[tokio::test(start_paused = true)]
async fn failed_flush_loses_the_batch_but_frees_slots() {
    let rig = rig(|b| b).await;
    rig.local.set_fail_inserts(true);

    for plate in ["川C10001", "川C10002", "川C10003"] {
        ask(&rig.service, 0, plate).await;
    }
    tokio::time::sleep(Duration::from_secs(7)).await;

    let staging = rig.service.new_plate_flusher().buffer();
    assert_eq!(staging.free_count(), staging.capacity());
    assert!(rig.local.unrecognized_batches().is_empty());

    rig.local.set_fail_inserts(false);
    ask(&rig.service, 0, "川C10004").await;
    rig.service.close().await;
    let batches = rig.local.unrecognized_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].plate, "川C10004");
}

#[derive(Default)]
struct Audit(Mutex<Vec<(usize, String, String)>>);

#[async_trait]
impl LookupObserver for Audit {
    async fn on_lookup_complete(&self, worker: usize, plate: &str, response: &LookupResponse) {
        self.0.lock().push((worker, plate.to_string(), response.error()));
    }
}

#[tokio::test(start_paused = true)]
async fn observer_sees_every_answer() {
    let audit = Arc::new(Audit::default());
    let observer = audit.clone();
    let rig = rig(move |b| b.with_observer(observer)).await;

    ask(&rig.service, 1, "川B00001").await;
    ask(&rig.service, 1, "X").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        *audit.0.lock(),
        vec![
            (1, "川B00001".to_string(), String::new()),
            (1, "X".to_string(), "invalid plate".to_string()),
        ]
    );

    rig.service.stop();
}

#[tokio::test]
async fn unknown_worker_index_is_refused() {
    let rig = rig(|b| b).await;
    let (responder, _rx) = oneshot_responder();
    let err = rig
        .service
        .submit(4, LookupTask::new("川B00001", "1", station(), responder))
        .unwrap_err();
    assert_eq!(err, PoolError::UnknownWorker { index: 4, count: 4 });
    rig.service.stop();
}

// Holds every insert for a second and remembers how many ran at once.
#[derive(Default)]
struct SlowLedger {
    batches:   Mutex<Vec<Vec<ConsumptionRecord>>>,
    in_flight: Mutex<(usize, usize)>,
}

#[async_trait]
impl BatchSink<ConsumptionRecord> for SlowLedger {
    async fn batch_insert(&self, records: Vec<ConsumptionRecord>) -> Result<(), StoreError> {
        {
            let mut in_flight = self.in_flight.lock();
            in_flight.0 += 1;
            in_flight.1 = in_flight.1.max(in_flight.0);
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.batches.lock().push(records);
        self.in_flight.lock().0 -= 1;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn close_finishes_consumption_insert_in_progress() {
    let ledger = Arc::new(SlowLedger::default());
    let sink = ledger.clone();
    let rig = rig(move |mut b| {
        b.consumption_sink = sink;
        b
    })
    .await;

    let record = |amount| ConsumptionRecord {
        plate: "川A12345".into(),
        amount,
        ..Default::default()
    };
    rig.service.submit_consumption(vec![record(100)]).unwrap();
    rig.service.submit_consumption(vec![record(200)]).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    rig.service.close().await;
    assert_eq!(ledger.batches.lock().clone(), vec![vec![record(100)], vec![record(200)]]);
    assert_eq!(ledger.in_flight.lock().1, 1);
    assert_eq!(rig.service.consumption().pending(), 0);
}
