use std::fmt::Debug;

use chrono::Local;
use chrono::NaiveDateTime;

use crate::error::LookupError;
use crate::traits::Responder;

/// Plates with fewer characters than this are rejected before any store is touched.
pub const MIN_PLATE_CHARS: usize = 7;
/// Plates with more characters than this are rejected before any store is touched.
pub const MAX_PLATE_CHARS: usize = 9;

/// A known vehicle, as kept by both the local cache and the central store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlateRecord {
    pub plate:         String,
    pub vehicle_class: String,
    pub vehicle_type:  String,
    pub num:           String,
    pub remark:        String,
    pub unit:          String,
    pub master:        String,
    pub monitor_level: String,
    pub sms_report:    bool,
    pub comment:       String,
    pub timestamp:     Option<NaiveDateTime>,
}

impl PlateRecord {
    pub fn new<S: Into<String>>(plate: S) -> Self {
        Self {
            plate: plate.into(),
            ..Default::default()
        }
    }
}

/// Where a lookup originated: the toll station and lane that observed the plate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationDescriptor {
    pub company_code: String,
    pub plaza_code:   String,
    pub lane_name:    String,
    pub lane_number:  String,
}

/// A plate nobody knows about yet, pending manual review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedPlate {
    pub plate:        String,
    pub vehicle_type: String,
    pub company_code: String,
    pub plaza_code:   String,
    pub lane_name:    String,
    pub lane_number:  String,
    /// Moment of staging, not the moment of the original observation.
    pub staged_at:    NaiveDateTime,
}

impl UnrecognizedPlate {
    pub fn stamp(plate: &str, vehicle_type: &str, station: &StationDescriptor) -> Self {
        Self {
            plate:        plate.to_string(),
            vehicle_type: vehicle_type.to_string(),
            company_code: station.company_code.clone(),
            plaza_code:   station.plaza_code.clone(),
            lane_name:    station.lane_name.clone(),
            lane_number:  station.lane_number.clone(),
            staged_at:    Local::now().naive_local(),
        }
    }
}

/// A toll consumption record. The core only ever persists these in batches and never looks inside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumptionRecord {
    pub plate:        String,
    pub vehicle_type: String,
    pub company_code: String,
    pub plaza_code:   String,
    pub lane_number:  String,
    /// Amount charged, in cents.
    pub amount:       i64,
    pub recorded_at:  Option<NaiveDateTime>,
}

/// The definitive answer to a lookup. A found response always carries its record; a missing one always carries the
/// reason.
#[derive(Debug, Clone)]
pub enum LookupResponse {
    Found(PlateRecord),
    Missing(LookupError),
}

impl LookupResponse {
    #[inline]
    pub fn found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn record(&self) -> Option<&PlateRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::Missing(_) => None,
        }
    }

    /// The error string of the response; empty for a found record.
    pub fn error(&self) -> String {
        match self {
            Self::Found(_) => String::new(),
            Self::Missing(err) => err.to_string(),
        }
    }

    pub fn into_parts(self) -> (bool, Option<PlateRecord>, String) {
        let error = self.error();
        match self {
            Self::Found(record) => (true, Some(record), error),
            Self::Missing(_) => (false, None, error),
        }
    }
}

/// One plate lookup request. Consumed by exactly one lookup worker.
pub struct LookupTask {
    pub plate:        String,
    pub vehicle_type: String,
    pub station:      StationDescriptor,
    responder:        Box<dyn Responder>,
}

impl LookupTask {
    pub fn new<S, T, R>(plate: S, vehicle_type: T, station: StationDescriptor, responder: R) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        R: Responder + 'static,
    {
        Self {
            plate: plate.into(),
            vehicle_type: vehicle_type.into(),
            station,
            responder: Box::new(responder),
        }
    }

    /// Deliver the response, consuming the task.
    pub(crate) fn respond(self, response: LookupResponse) {
        self.responder.respond(response);
    }
}

impl Debug for LookupTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupTask")
            .field("plate", &self.plate)
            .field("vehicle_type", &self.vehicle_type)
            .field("station", &self.station)
            .finish_non_exhaustive()
    }
}
