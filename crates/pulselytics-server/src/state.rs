use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pulselytics_core::analytics::{AnalyticsBackend, ProfileStore};
use pulselytics_core::config::Config;
use pulselytics_core::profiler::Profiler;
use pulselytics_duckdb::DuckDbBackend;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// All fields are safe to clone cheaply — heavy resources are wrapped in
/// `Arc`, and the DuckDB backend internally serialises access through
/// `Arc<tokio::sync::Mutex<Connection>>`.
pub struct AppState {
    pub db: Arc<DuckDbBackend>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// The profiling engine, built over the same backend for reads and the
    /// profile table for writes.
    pub profiler: Profiler,

    /// Whether a scheduled `recompute_all` pass is currently in flight.
    /// Guards the scheduler against overlapping runs; manual triggers run
    /// synchronously and are not gated.
    profile_refresh_running: AtomicBool,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        let profiler = Profiler::new(
            Arc::clone(&db) as Arc<dyn AnalyticsBackend>,
            Arc::clone(&db) as Arc<dyn ProfileStore>,
        );
        Self {
            db,
            config: Arc::new(config),
            profiler,
            profile_refresh_running: AtomicBool::new(false),
        }
    }

    /// Claim the refresh slot. Returns `false` when a pass is already
    /// running — the caller should skip its tick.
    pub fn try_begin_profile_refresh(&self) -> bool {
        self.profile_refresh_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the refresh slot after a pass completes or fails.
    pub fn end_profile_refresh(&self) {
        self.profile_refresh_running.store(false, Ordering::SeqCst);
    }
}
