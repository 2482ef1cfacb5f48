use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing_log::log::SetLoggerError;
use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` isn't set.
pub const DEFAULT_FILTER: &str = "strata=info";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to install the tracing subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),

    #[error("Failed to forward log records to tracing: {0}")]
    Log(#[from] SetLoggerError),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the process-wide subscriber, emitting either human-readable or JSON lines.
pub fn prepare_tracing(json: bool) -> Result<(), TelemetryError> {
    LogTracer::init()?;

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    if json {
        set_global_default(builder.json().finish())?;
    } else {
        set_global_default(builder.finish())?;
    }

    Ok(())
}
