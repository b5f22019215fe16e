//! Link-loss detection loop.
//!
//! Periodically marks vehicles that stopped reporting as stale so the
//! dashboard stops presenting their last verdict as live.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::state::AppState;

/// Start the staleness sweep.
pub async fn run_staleness_loop(state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(1));

    loop {
        ticker.tick().await;

        let changed = state.mark_stale(Utc::now());
        if changed > 0 {
            tracing::debug!("Marked {} vehicle(s) stale", changed);
        }
    }
}
