//! Scheduled profile refresh.
//!
//! A single periodic timer per process: Idle → Running → Idle. The first
//! tick fires one full interval after startup, never immediately. A tick
//! that arrives while the previous pass is still running is skipped and
//! logged — the compare-and-swap guard on [`AppState`] keeps at most one
//! `recompute_all` in flight per process.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::state::AppState;

pub async fn run_profile_refresh_loop(state: Arc<AppState>) {
    let period = state.config.profile_refresh_interval();
    info!(
        interval_seconds = period.as_secs(),
        "Profile refresh scheduler started"
    );

    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if !state.try_begin_profile_refresh() {
            warn!("Previous profile refresh still running — skipping this tick");
            continue;
        }
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            run_once(&state).await;
            state.end_profile_refresh();
        });
    }
}

/// One refresh pass. Failures are logged, never propagated — the next
/// scheduled tick proceeds normally.
async fn run_once(state: &Arc<AppState>) {
    match state.profiler.recompute_all().await {
        Ok(summary) => info!(
            total = summary.total,
            success = summary.success,
            failed = summary.failed,
            "Scheduled profile refresh completed"
        ),
        Err(err) => error!(error = %err, "Scheduled profile refresh failed"),
    }
}
