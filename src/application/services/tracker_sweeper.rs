use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::ports::JobTracker;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodically evicts expired job records. The first sweep runs one full
/// interval after start.
pub fn spawn_tracker_sweeper(tracker: Arc<dyn JobTracker>, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep_once(tracker.as_ref()).await;
        }
    })
}

pub async fn sweep_once(tracker: &dyn JobTracker) -> usize {
    tracing::info!("Running job tracker cleanup");
    match tracker.cleanup(Utc::now()).await {
        Ok(removed) => {
            tracing::info!(removed = removed, "Job tracker cleanup finished");
            removed
        }
        Err(e) => {
            tracing::error!(error = %e, "Job tracker cleanup failed");
            0
        }
    }
}
