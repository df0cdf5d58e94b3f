//! # plate-lookup
//!
//! Plate lookup with a local cache, a central store fallback, and write-behind of everything learned along the way.
//!
//! Toll lanes ask "who is this vehicle?" many times per second, and the answer must not wait for a database write.
//! This crate answers from a local cache first. On a miss it asks the central store, but only for plates of the home
//! region. It then stages whatever it learned for asynchronous batch insertion:
//!
//! - a central store hit is staged for refilling the local cache;
//! - a plate nobody knows is staged as an unrecognized plate for later review.
//!
//! # Components
//!
//! - [`LookupWorkerPool`] runs a fixed number of [`LookupWorker`](pool::LookupWorker)s, each with its own FIFO task
//!   queue. A caller picks the worker by index; every task gets exactly one answer through its
//!   [`Responder`](traits::Responder).
//! - [`StagingSlotBuffer`] is a fixed-capacity set of slots cycling through `Free -> Reserved -> Ready -> Flushing -> Free`. Lookup
//!   workers fill slots, a [`BatchFlushWorker`] empties them.
//! - [`BatchFlushWorker`] flushes ready slots in one batch insert once enough of them accumulated or enough ticks
//!   went by. A failed insert drops the batch; the slots are recycled either way.
//! - [`ConsumptionRecordWriter`] persists batches of consumption records through a bounded queue which rejects new
//!   batches when full.
//! - [`PlateService`] wires all of the above together from a [`ServiceConfig`] and a set of
//!   [`Backends`](service::Backends).
//!
//! Stores are abstracted behind [`PlateSource`] and [`BatchSink`]. [`MemoryStore`] is an in-process implementation
//! over a [moka](https://crates.io/crates/moka) cache; with the `db` feature, [`DbStore`](db::DbStore) talks to a real
//! database through SeaORM.
//!
//! # Features
//!
//! - `db`, plus `sqlite` or `pg` for the driver: the SeaORM store and its migrations.
//! - `cli`: [`ServiceArgs`](cli::ServiceArgs), a `clap` argument group bound to `PLATE_LOOKUP_*` environment
//!   variables.
//! - `tracing`: [`init_tracing`] for hosts which don't set up a subscriber themselves.

#[cfg(feature = "cli")]
pub mod cli;
pub mod consumption;
pub(crate) mod control;
#[cfg(feature = "db")]
pub mod db;
pub mod error;
pub mod flush;
#[cfg(feature = "tracing")]
mod logging;
pub mod lookup;
pub mod memory;
pub mod pool;
pub mod service;
pub mod staging;
pub mod traits;
pub mod types;

#[doc(inline)]
pub use consumption::ConsumptionRecordWriter;
#[doc(inline)]
pub use flush::BatchFlushWorker;
#[cfg(feature = "tracing")]
pub use logging::init_tracing;
#[doc(inline)]
pub use lookup::LookupContext;
#[doc(inline)]
pub use memory::MemoryStore;
#[doc(inline)]
pub use pool::LookupWorkerPool;
#[doc(inline)]
pub use service::PlateService;
#[doc(inline)]
pub use service::ServiceConfig;
#[doc(inline)]
pub use staging::StagingSlotBuffer;
#[doc(inline)]
pub use traits::BatchSink;
#[doc(inline)]
pub use traits::PlateSource;

pub mod prelude {
    pub use crate::consumption::ConsumptionQueuePolicy;
    pub use crate::consumption::ConsumptionRecordWriter;
    pub use crate::error::*;
    pub use crate::flush::BatchFlushWorker;
    pub use crate::flush::FlushPolicy;
    pub use crate::lookup::LookupContext;
    pub use crate::memory::MemoryStore;
    pub use crate::pool::LookupWorkerPool;
    pub use crate::service::Backends;
    pub use crate::service::PlateService;
    pub use crate::service::ServiceConfig;
    pub use crate::staging::SlotId;
    pub use crate::staging::StagingSlotBuffer;
    pub use crate::traits::*;
    pub use crate::types::*;
}
