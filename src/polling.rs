//! Repeatedly drives a step handler until shutdown is requested.
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One unit of recurring work, e.g. a single receive-and-dispatch round.
#[async_trait]
pub trait StepHandler: Sync + Send {
    type Error: Display + Send;

    async fn handle_step(&self) -> Result<(), Self::Error>;
}

/// Run `handler` until `shutdown` is cancelled, waiting `interval` between steps.
///
/// Shutdown is only observed between steps: a step in progress always runs to
/// completion. A failed step is logged and the loop carries on with the next one.
/// Returns the number of steps run.
pub async fn run_polling_loop<S: StepHandler + ?Sized>(
    handler: &S,
    interval: Duration,
    shutdown: CancellationToken,
) -> usize {
    let mut steps = 0;

    loop {
        if shutdown.is_cancelled() {
            info!("Shutdown requested, stopping after {steps} step(s)");
            break;
        }

        if let Err(e) = handler.handle_step().await {
            warn!("Polling step failed: {e}");
        }
        steps += 1;

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(interval) => {
                debug!("Waited {}ms before next step", interval.as_millis());
            }
        }
    }

    steps
}
