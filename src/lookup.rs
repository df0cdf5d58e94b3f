//! The per-plate decision procedure: local cache, then (maybe) the central store, then (maybe) a staged write.

use std::sync::Arc;

use fieldx::fxstruct;
use tracing::debug;
use tracing::error;
use tracing::instrument;
use tracing::warn;

use crate::error::LookupError;
use crate::staging::StagingSlotBuffer;
use crate::traits::PlateSource;
use crate::types::LookupResponse;
use crate::types::PlateRecord;
use crate::types::StationDescriptor;
use crate::types::UnrecognizedPlate;
use crate::types::MAX_PLATE_CHARS;
use crate::types::MIN_PLATE_CHARS;

/// Plates starting with this marker are eligible for a central store lookup on a cache miss.
pub const DEFAULT_HOME_REGION: &str = "川";

/// Plate length is counted in characters, not bytes.
pub fn is_valid_plate(plate: &str) -> bool {
    (MIN_PLATE_CHARS..=MAX_PLATE_CHARS).contains(&plate.chars().count())
}

/// Everything a lookup needs, injected once at assembly time.
#[fxstruct(no_new, builder, default(off))]
pub struct LookupContext {
    /// The local cache store.
    #[fieldx(get(clone), builder(required))]
    cache: Arc<dyn PlateSource>,

    #[fieldx(get(clone), builder(required))]
    central: Arc<dyn PlateSource>,

    /// Central store hits waiting to be written back into the local cache.
    #[fieldx(get(clone), builder(required))]
    car_staging: Arc<StagingSlotBuffer<PlateRecord>>,

    #[fieldx(get(clone), builder(required))]
    new_plate_staging: Arc<StagingSlotBuffer<UnrecognizedPlate>>,

    #[fieldx(get, builder(into), default(String::from(DEFAULT_HOME_REGION)))]
    home_region: String,
}

impl LookupContext {
    #[inline]
    pub fn is_home_region(&self, plate: &str) -> bool {
        plate.starts_with(self.home_region.as_str())
    }

    /// Answer one lookup. Staging failures are logged and never change the answer.
    #[instrument(level = "debug", skip(self, station))]
    pub async fn resolve(&self, plate: &str, vehicle_type: &str, station: &StationDescriptor) -> LookupResponse {
        if !is_valid_plate(plate) {
            warn!("rejecting invalid plate '{plate}'");
            return LookupResponse::Missing(LookupError::InvalidPlate);
        }

        match self.cache.find_by_plate(plate).await {
            Ok(Some(record)) => {
                debug!("cache hit for '{plate}'");
                return LookupResponse::Found(record);
            }
            Ok(None) => (),
            Err(err) => {
                error!("local cache lookup failed: {err}");
                return LookupResponse::Missing(err.into());
            }
        }

        if !self.is_home_region(plate) {
            debug!("'{plate}' is out of region, central store not consulted");
            self.stage_unrecognized(plate, vehicle_type, station);
            return LookupResponse::Missing(LookupError::NotFound);
        }

        match self.central.find_by_plate(plate).await {
            Ok(Some(record)) => {
                debug!("central store hit for '{plate}'");
                self.stage_refill(&record);
                LookupResponse::Found(record)
            }
            Ok(None) => {
                debug!("'{plate}' unknown to the central store");
                self.stage_unrecognized(plate, vehicle_type, station);
                LookupResponse::Missing(LookupError::NotFound)
            }
            Err(err) => {
                error!("central store lookup failed: {err}");
                LookupResponse::Missing(err.into())
            }
        }
    }

    fn stage_refill(&self, record: &PlateRecord) {
        if let Err(err) = self.car_staging.stage(record.clone()) {
            error!(
                "[{}] could not stage cache refill for '{}': {err}",
                self.car_staging.name(),
                record.plate
            );
        }
    }

    fn stage_unrecognized(&self, plate: &str, vehicle_type: &str, station: &StationDescriptor) {
        let entry = UnrecognizedPlate::stamp(plate, vehicle_type, station);
        if let Err(err) = self.new_plate_staging.stage(entry) {
            error!(
                "[{}] could not stage unrecognized plate '{plate}': {err}",
                self.new_plate_staging.name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;
    use chrono::Local;

    use super::*;
    use crate::error::StoreError;

    #[derive(Default)]
    struct Source {
        record: Option<PlateRecord>,
        fail:   bool,
        calls:  AtomicUsize,
    }

    impl Source {
        fn with(record: PlateRecord) -> Arc<Self> {
            Arc::new(Self {
                record: Some(record),
                ..Default::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlateSource for Source {
        async fn find_by_plate(&self, plate: &str) -> Result<Option<PlateRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Query {
                    plate:   plate.to_string(),
                    message: "connection reset".into(),
                });
            }
            Ok(self.record.clone().filter(|r| r.plate == plate))
        }
    }

    struct Fixture {
        ctx:     LookupContext,
        cache:   Arc<Source>,
        central: Arc<Source>,
    }

    fn fixture(cache: Arc<Source>, central: Arc<Source>) -> Fixture {
        let ctx = LookupContext::builder()
            .cache(cache.clone())
            .central(central.clone())
            .car_staging(Arc::new(StagingSlotBuffer::new("car", 4)))
            .new_plate_staging(Arc::new(StagingSlotBuffer::new("new_plate", 4)))
            .build()
            .unwrap();
        Fixture { ctx, cache, central }
    }

    fn station() -> StationDescriptor {
        StationDescriptor {
            company_code: "C01".into(),
            plaza_code:   "P07".into(),
            lane_name:    "Entry 3".into(),
            lane_number:  "3".into(),
        }
    }

    fn staged_unrecognized(ctx: &LookupContext) -> Vec<UnrecognizedPlate> {
        let buf = ctx.new_plate_staging();
        buf.take_ready(&buf.ready_slots()).1
    }

    fn staged_refills(ctx: &LookupContext) -> Vec<PlateRecord> {
        let buf = ctx.car_staging();
        buf.take_ready(&buf.ready_slots()).1
    }

    #[test]
    fn builder_defaults_home_region() {
        let f = fixture(Arc::new(Source::default()), Arc::new(Source::default()));
        assert_eq!(f.ctx.home_region(), DEFAULT_HOME_REGION);
        assert!(f.ctx.is_home_region("川A12345"));
        assert!(!f.ctx.is_home_region("京A12345"));

        let ctx = LookupContext::builder()
            .cache(Arc::new(Source::default()))
            .central(Arc::new(Source::default()))
            .car_staging(Arc::new(StagingSlotBuffer::new("car", 1)))
            .new_plate_staging(Arc::new(StagingSlotBuffer::new("new_plate", 1)))
            .home_region("京")
            .build()
            .unwrap();
        assert!(ctx.is_home_region("京A12345"));
    }

    #[test]
    fn plate_length_bounds() {
        assert!(!is_valid_plate(""));
        assert!(!is_valid_plate("A12345"));
        assert!(is_valid_plate("川A12345"));
        assert!(is_valid_plate("川A123456"));
        assert!(is_valid_plate("川A1234567"));
        assert!(is_valid_plate("ABC12345X"));
        assert!(!is_valid_plate("ABC123456X"));
    }

    #[tokio::test]
    async fn invalid_plates_touch_no_store() {
        let f = fixture(Source::with(PlateRecord::new("川A12345")), Arc::new(Source::default()));

        for plate in ["", "川A1234", "川A12345678"] {
            let response = f.ctx.resolve(plate, "1", &station()).await;
            assert!(!response.found());
            assert_eq!(response.error(), "invalid plate");
        }
        assert_eq!(f.cache.calls(), 0);
        assert_eq!(f.central.calls(), 0);
    }

    #[tokio::test]
    async fn cache_hit_skips_central() {
        let mut record = PlateRecord::new("川A12345");
        record.master = "Zhang Wei".into();
        record.sms_report = true;
        let f = fixture(Source::with(record.clone()), Arc::new(Source::default()));

        let response = f.ctx.resolve("川A12345", "1", &station()).await;
        let (found, got, error) = response.into_parts();
        assert!(found);
        assert_eq!(got, Some(record));
        assert!(error.is_empty());
        assert_eq!(f.central.calls(), 0);
        assert!(staged_refills(&f.ctx).is_empty());
        assert!(staged_unrecognized(&f.ctx).is_empty());
    }

    #[tokio::test]
    async fn out_of_region_miss_stages_unrecognized() {
        let f = fixture(Arc::new(Source::default()), Source::with(PlateRecord::new("京B99999")));

        let response = f.ctx.resolve("京B99999", "2", &station()).await;
        assert!(!response.found());
        assert_eq!(response.error(), "no record found");
        assert_eq!(f.central.calls(), 0);

        let staged = staged_unrecognized(&f.ctx);
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].plate, "京B99999");
        assert_eq!(staged[0].vehicle_type, "2");
    }

    #[tokio::test]
    async fn central_hit_stages_refill() {
        let record = PlateRecord::new("川A54321");
        let f = fixture(Arc::new(Source::default()), Source::with(record.clone()));

        let response = f.ctx.resolve("川A54321", "1", &station()).await;
        assert_eq!(response.record(), Some(&record));
        assert_eq!(f.central.calls(), 1);
        assert_eq!(staged_refills(&f.ctx), vec![record]);
        assert!(staged_unrecognized(&f.ctx).is_empty());
    }

    #[tokio::test]
    async fn double_miss_stages_unrecognized_with_station() {
        let f = fixture(Arc::new(Source::default()), Arc::new(Source::default()));

        let before = Local::now().naive_local();
        let response = f.ctx.resolve("川A12345", "1", &station()).await;
        let after = Local::now().naive_local();
        assert!(!response.found());
        assert!(response.record().is_none());
        assert_eq!(response.error(), "no record found");

        let staged = staged_unrecognized(&f.ctx);
        assert_eq!(staged.len(), 1);
        let entry = &staged[0];
        assert_eq!(entry.plate, "川A12345");
        assert_eq!(entry.company_code, "C01");
        assert_eq!(entry.plaza_code, "P07");
        assert_eq!(entry.lane_name, "Entry 3");
        assert_eq!(entry.lane_number, "3");
        assert!(before <= entry.staged_at && entry.staged_at <= after);
        assert!(staged_refills(&f.ctx).is_empty());
    }

    #[tokio::test]
    async fn cache_failure_is_not_a_miss() {
        let f = fixture(Source::failing(), Source::with(PlateRecord::new("川A12345")));

        let response = f.ctx.resolve("川A12345", "1", &station()).await;
        assert!(!response.found());
        assert!(response.error().contains("connection reset"));
        assert_eq!(f.central.calls(), 0);
        assert!(staged_unrecognized(&f.ctx).is_empty());
    }

    #[tokio::test]
    async fn central_failure_is_reported() {
        let f = fixture(Arc::new(Source::default()), Source::failing());

        let response = f.ctx.resolve("川A12345", "1", &station()).await;
        assert!(matches!(response, LookupResponse::Missing(LookupError::Store(_))));
        assert!(staged_unrecognized(&f.ctx).is_empty());
        assert!(staged_refills(&f.ctx).is_empty());
    }

    #[tokio::test]
    async fn exhausted_staging_does_not_change_answer() {
        let record = PlateRecord::new("川A54321");
        let f = fixture(Arc::new(Source::default()), Source::with(record.clone()));
        let car = f.ctx.car_staging();
        while car.allocate().is_ok() {}

        let response = f.ctx.resolve("川A54321", "1", &station()).await;
        assert_eq!(response.record(), Some(&record));
    }
}
