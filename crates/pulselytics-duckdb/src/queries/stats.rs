use anyhow::Result;
use chrono::{NaiveDate, Utc};

use pulselytics_core::analytics::{EventNameCount, HourlyBucket, StatsResult};

use crate::queries::date_floor;
use crate::DuckDbBackend;

/// Overview stats: total count, per-name ranking, and an hourly series for
/// the trailing 24 hours. `start`/`end` are independently optional inclusive
/// calendar dates bounding the total and the ranking; the hourly series is
/// always the trailing 24 hours from now, narrowed only by `event_type`.
pub async fn get_stats_inner(
    db: &DuckDbBackend,
    event_type: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<StatsResult> {
    let conn = db.conn.lock().await;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    if let Some(event_type) = event_type {
        filter_sql.push_str(&format!(" AND event_type = ?{param_idx}"));
        params.push(Box::new(event_type.to_string()));
        param_idx += 1;
    }
    if let Some(start) = start {
        filter_sql.push_str(&format!(" AND created_at >= ?{param_idx}"));
        params.push(Box::new(date_floor(start)));
        param_idx += 1;
    }
    if let Some(end) = end {
        filter_sql.push_str(&format!(" AND created_at < ?{param_idx}"));
        params.push(Box::new(date_floor(end + chrono::Duration::days(1))));
    }

    let param_refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let total_sql = format!("SELECT COUNT(*) FROM events WHERE 1=1{filter_sql}");
    let total: i64 = conn
        .prepare(&total_sql)?
        .query_row(param_refs.as_slice(), |row| row.get(0))?;

    let by_name_sql = format!(
        r#"
        SELECT event_name, COUNT(*) AS count
        FROM events
        WHERE 1=1{filter_sql}
        GROUP BY event_name
        ORDER BY count DESC, event_name ASC
        "#
    );
    let mut stmt = conn.prepare(&by_name_sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(EventNameCount {
            event_name: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut by_event_name = Vec::new();
    for row in rows {
        by_event_name.push(row?);
    }

    // Trailing 24 hours from now, hourly buckets ascending. The cutoff
    // replaces any caller-supplied range; only the type filter carries over.
    let cutoff = (Utc::now() - chrono::Duration::hours(24))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let mut trend_filter_sql = String::new();
    let mut trend_params: Vec<Box<dyn duckdb::types::ToSql>> = vec![Box::new(cutoff)];
    if let Some(event_type) = event_type {
        trend_filter_sql.push_str(" AND event_type = ?2");
        trend_params.push(Box::new(event_type.to_string()));
    }
    let trend_sql = format!(
        r#"
        SELECT CAST(date_trunc('hour', created_at) AS VARCHAR) AS hour, COUNT(*) AS count
        FROM events
        WHERE created_at >= ?1{trend_filter_sql}
        GROUP BY hour
        ORDER BY hour ASC
        "#
    );
    let trend_refs: Vec<&dyn duckdb::types::ToSql> =
        trend_params.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&trend_sql)?;
    let rows = stmt.query_map(trend_refs.as_slice(), |row| {
        Ok(HourlyBucket {
            hour: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut recent_trend = Vec::new();
    for row in rows {
        recent_trend.push(row?);
    }

    Ok(StatsResult {
        total,
        by_event_name,
        recent_trend,
    })
}
