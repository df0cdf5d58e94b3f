use thiserror::Error;

use crate::staging::SlotId;

/// Failure of a backing store to execute a query or an insert.
///
/// A store error is never the same thing as "no rows": the lookup path reports it back to the caller verbatim instead
/// of treating it as a cache miss.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("query for plate '{plate}' failed: {message}")]
    Query { plate: String, message: String },

    #[error("batch insert of {count} {kind} record(s) failed: {message}")]
    Insert {
        kind:    &'static str,
        count:   usize,
        message: String,
    },

    /// The collaborator could not be reached at the point of use.
    #[error("store '{0}' is unavailable")]
    Unavailable(String),

    #[cfg(feature = "db")]
    #[error("database error: {0}")]
    Db(String),
}

#[cfg(feature = "db")]
impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        StoreError::Db(err.to_string())
    }
}

/// What a lookup reports back when it cannot produce a record.
///
/// The `Display` form is the error string delivered to the responder.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("invalid plate")]
    InvalidPlate,

    #[error("no record found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StagingError {
    #[error("no free staging slot")]
    Exhausted,

    #[error("slot {0} does not exist")]
    UnknownSlot(SlotId),

    #[error("slot {0} is not reserved for writing")]
    NotReserved(SlotId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue full, retry later")]
    Full,

    #[error("refusing to queue an empty batch")]
    EmptyBatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("no lookup worker with index {index}; pool has {count}")]
    UnknownWorker { index: usize, count: usize },
}

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("cannot assemble lookup context: {0}")]
    Context(String),
}
