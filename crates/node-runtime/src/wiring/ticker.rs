//! Period ticker: starts a period now and then on every wall-clock
//! boundary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use xt_publisher::{PeriodClock, PublisherApi, TimeSource};

pub async fn run_period_ticker<P, T>(
    publisher: Arc<P>,
    clock: PeriodClock,
    time: T,
    mut shutdown: watch::Receiver<bool>,
) where
    P: PublisherApi + ?Sized,
    T: TimeSource,
{
    loop {
        match publisher.start_period().await {
            Ok(start) => info!(
                period = start.period_id,
                target = start.target_superblock,
                wall_clock_period = time.current_period(&clock),
                "Tick"
            ),
            Err(e) if e.is_liveness_failure() => {
                warn!(error = %e, "Period not started, network rolled back")
            }
            Err(e) => error!(error = %e, "Failed to start period"),
        }

        let wait = clock.until_next(time.now());
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }
    }
    info!("Period ticker stopped");
}
