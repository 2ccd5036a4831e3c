/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is passed at runtime from `Config.duckdb_memory_limit`
/// (env `PULSELYTICS_DUCKDB_MEMORY`, default `"1GB"`); an explicit limit is
/// always set because DuckDB's default is 80% of system RAM. `threads = 2`
/// bounds the background pool for single-writer embedded use.
///
/// Event ids come from `events_id_seq` — monotonic per database, assigned at
/// insert. `created_at` is written once at ingestion and is the sole time
/// axis for every aggregation; `properties` is the serialized JSON bag read
/// with `json_extract_string` at query time.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

CREATE SEQUENCE IF NOT EXISTS events_id_seq;

-- ===========================================
-- EVENTS (append-only)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    id              BIGINT PRIMARY KEY DEFAULT nextval('events_id_seq'),
    event_name      VARCHAR NOT NULL,
    event_type      VARCHAR NOT NULL DEFAULT 'custom',
    properties      VARCHAR,                       -- JSON string (nullable)
    user_id         VARCHAR,                       -- NULL for anonymous events
    session_id      VARCHAR,
    duration_ms     BIGINT,
    error_message   VARCHAR,
    ip              VARCHAR,
    user_agent      VARCHAR,
    request_id      VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_name         ON events(event_name);
CREATE INDEX IF NOT EXISTS idx_events_type         ON events(event_type);
CREATE INDEX IF NOT EXISTS idx_events_user         ON events(user_id);
CREATE INDEX IF NOT EXISTS idx_events_created      ON events(created_at);
-- Per-user scans for the profiling engine
CREATE INDEX IF NOT EXISTS idx_events_user_created ON events(user_id, created_at);

-- ===========================================
-- USER PROFILES (derived, one row per user)
-- ===========================================
CREATE TABLE IF NOT EXISTS user_profiles (
    user_id           VARCHAR PRIMARY KEY,
    register_time     TIMESTAMP,
    last_active_time  TIMESTAMP,
    total_events      BIGINT NOT NULL DEFAULT 0,
    active_days       BIGINT NOT NULL DEFAULT 0,
    tags              VARCHAR,                     -- JSON array
    behavior_features VARCHAR,                     -- JSON object
    value_assessment  VARCHAR,                     -- JSON object
    activity_level    VARCHAR,
    value_level       VARCHAR,
    created_at        TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at        TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_profiles_activity    ON user_profiles(activity_level);
CREATE INDEX IF NOT EXISTS idx_profiles_value       ON user_profiles(value_level);
CREATE INDEX IF NOT EXISTS idx_profiles_last_active ON user_profiles(last_active_time);
"#
    )
}
