use std::sync::Arc;

use anyhow::Result;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use pulselytics_core::error::StoreError;
use pulselytics_core::event::NewEvent;

use crate::schema::init_sql;

/// A DuckDB backend for Pulselytics.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// cause contention. We wrap the connection in `Arc<Mutex<_>>` so the async
/// runtime serialises access while the struct stays cheap to clone and share
/// across Axum handlers and the scheduler task.
///
/// Memory and thread limits are enforced by [`init_sql`] at open time.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`,
    /// read from `Config.duckdb_memory_limit` at the call site. Runs the
    /// schema init SQL so tables, indexes, and the id sequence exist.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests only — data is discarded when the struct is
    /// dropped. Uses a 1GB memory limit (tests are not memory-constrained).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert one event and return its sequence-assigned id.
    pub(crate) async fn append_inner(&self, event: &NewEvent) -> Result<i64> {
        let conn = self.conn.lock().await;
        let id = insert_event(&conn, event)?;
        Ok(id)
    }

    /// Insert a batch of events in a single transaction.
    ///
    /// One commit for the whole batch: either every row lands or, on any
    /// failure, the transaction rolls back and nothing is stored. Callers
    /// validate the batch before reaching this point.
    pub(crate) async fn append_batch_inner(&self, events: &[NewEvent]) -> Result<Vec<i64>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let mut ids = Vec::with_capacity(events.len());
        for event in events {
            ids.push(insert_event(&tx, event)?);
        }

        tx.commit()?;
        tracing::info!(count = ids.len(), "Inserted event batch into DuckDB");
        Ok(ids)
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    ///
    /// Called by the `/health` endpoint. Returns an error if the connection
    /// is unavailable (file locked, disk full, etc.).
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the DuckDB connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify stored data.
    /// Production code should use the typed methods on the backend traits.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

fn insert_event(conn: &Connection, event: &NewEvent) -> Result<i64> {
    let properties = event
        .properties
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let mut stmt = conn.prepare(
        r#"INSERT INTO events (
            event_name, event_type, properties, user_id, session_id,
            duration_ms, error_message, ip, user_agent, request_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        RETURNING id"#,
    )?;
    let id: i64 = stmt.query_row(
        duckdb::params![
            event.event_name,
            event.event_type,
            properties,
            event.user_id,
            event.session_id,
            event.duration_ms,
            event.error_message,
            event.ip,
            event.user_agent,
            event.request_id,
            event.created_at.to_rfc3339(),
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Classify an error from the query layer into the shared taxonomy.
///
/// Connection-level DuckDB failures become `Unavailable`; everything else is
/// `Internal`. The raw driver error never reaches callers unclassified.
pub(crate) fn map_storage_error(err: anyhow::Error) -> StoreError {
    let msg = err.to_string();
    let lowered = msg.to_ascii_lowercase();
    let connection_level = lowered.contains("io error")
        || lowered.contains("could not set lock")
        || lowered.contains("database is locked")
        || lowered.contains("out of memory")
        || lowered.contains("disk");
    if connection_level {
        StoreError::Unavailable(msg)
    } else {
        StoreError::Internal(err)
    }
}
