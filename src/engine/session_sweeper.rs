//! Background removal of expired sessions
//!
//! Runs one sweep at startup, then on a fixed interval. Failures are logged
//! and the loop keeps going.

use tokio::time::{interval, Duration};

use super::SessionStore;

pub fn spawn_session_sweeper(sessions: SessionStore, interval_secs: u64) {
    if interval_secs == 0 {
        tracing::info!("Session sweeper is disabled");
        return;
    }

    tracing::info!(interval_secs = interval_secs, "Starting session sweeper");

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            // The first tick completes immediately
            tick.tick().await;
            run_sweep(&sessions).await;
        }
    });
}

async fn run_sweep(sessions: &SessionStore) {
    match sessions.sweep().await {
        Ok(0) => tracing::debug!("Session sweep found nothing to remove"),
        Ok(removed) => tracing::info!(removed = removed, "Removed expired sessions"),
        Err(e) => tracing::error!(error = %e, "Session sweep failed"),
    }
}
