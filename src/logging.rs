use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::util::TryInitError;

/// Install a global subscriber printing to stdout, filtered by `RUST_LOG`.
///
/// Hosts with their own subscriber setup should not call this; a second global subscriber is refused with an error.
pub fn init_tracing() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE))
        .try_init()?;

    info!("Tracing initialized");

    Ok(())
}
