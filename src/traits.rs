use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::StoreError;
use crate::types::LookupResponse;
use crate::types::PlateRecord;

/// A store that can answer a point lookup by plate: the local cache or the central store.
#[async_trait]
pub trait PlateSource: Send + Sync + 'static {
    /// Exact-match lookup limited to one row. `Ok(None)` is a miss; `Err` is an execution failure.
    async fn find_by_plate(&self, plate: &str) -> Result<Option<PlateRecord>, StoreError>;
}

/// A store accepting batches of records of type `R`.
#[async_trait]
pub trait BatchSink<R>: Send + Sync + 'static
where
    R: Send + 'static,
{
    async fn batch_insert(&self, records: Vec<R>) -> Result<(), StoreError>;
}

/// The single-shot channel delivering a lookup's answer back to whoever asked.
///
/// Taking `self` by box makes a second invocation impossible.
pub trait Responder: Send {
    fn respond(self: Box<Self>, response: LookupResponse);
}

impl<F> Responder for F
where
    F: FnOnce(LookupResponse) + Send,
{
    fn respond(self: Box<Self>, response: LookupResponse) {
        (*self)(response)
    }
}

/// A responder paired with the receiver its answer arrives on.
pub fn oneshot_responder() -> (impl Responder, oneshot::Receiver<LookupResponse>) {
    let (tx, rx) = oneshot::channel();
    let responder = move |response: LookupResponse| {
        // The asking side may have given up; nothing to do about it here.
        let _ = tx.send(response);
    };
    (responder, rx)
}

/// Gets told about every lookup once its responder has fired.
#[async_trait]
pub trait LookupObserver: Send + Sync + 'static {
    async fn on_lookup_complete(&self, _worker: usize, _plate: &str, _response: &LookupResponse) {}
}
