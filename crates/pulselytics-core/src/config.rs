use std::time::Duration;

/// Runtime configuration, read once at startup from `PULSELYTICS_*`
/// environment variables. Lives in core so the server and integration tests
/// share one parsing path.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// DuckDB size string, e.g. "512MB" or "1GB".
    pub duckdb_memory_limit: String,
    /// Seconds between scheduled profile recompute passes.
    pub profile_refresh_secs: u64,
    pub default_page_size: i64,
}

const MIN_REFRESH_SECS: u64 = 60;
const MAX_REFRESH_SECS: u64 = 86_400;
const DEFAULT_REFRESH_SECS: u64 = 3_600;

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("PULSELYTICS_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("PULSELYTICS_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string()),
            duckdb_memory_limit: std::env::var("PULSELYTICS_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            profile_refresh_secs: std::env::var("PULSELYTICS_PROFILE_REFRESH_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(|v| v.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS))
                .unwrap_or(DEFAULT_REFRESH_SECS),
            default_page_size: 50,
        })
    }

    pub fn profile_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.profile_refresh_secs)
    }
}
