use anyhow::Result;

use pulselytics_core::analytics::{round2, PAGE_VIEW_EVENT};
use pulselytics_core::profile::{
    FeatureUsageRow, PagePreferenceRow, UserBasicInfo, VisitFrequency,
};

use crate::queries::{page_name_expr, parse_timestamp};
use crate::DuckDbBackend;

/// Single aggregate row over one user's events. `None` when the user has no
/// events — callers treat that as "not found", not as an error.
pub async fn user_basic_info_inner(
    db: &DuckDbBackend,
    user_id: &str,
) -> Result<Option<UserBasicInfo>> {
    let conn = db.conn.lock().await;

    let mut stmt = conn.prepare(
        r#"
        SELECT CAST(MIN(created_at) AS VARCHAR),
               CAST(MAX(created_at) AS VARCHAR),
               COUNT(*) AS total_events,
               COUNT(DISTINCT CAST(created_at AS DATE)) AS active_days
        FROM events
        WHERE user_id = ?1
        "#,
    )?;
    let (register, last_active, total_events, active_days): (
        Option<String>,
        Option<String>,
        i64,
        i64,
    ) = stmt.query_row(duckdb::params![user_id], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    })?;

    let (Some(register), Some(last_active)) = (register, last_active) else {
        return Ok(None);
    };
    if total_events == 0 {
        return Ok(None);
    }

    Ok(Some(UserBasicInfo {
        user_id: user_id.to_string(),
        register_time: parse_timestamp(&register)?,
        last_active_time: parse_timestamp(&last_active)?,
        total_events,
        active_days,
    }))
}

/// Visit totals for the frequency block. The daily average is computed by
/// the profiler, not here.
pub async fn user_visit_frequency_inner(
    db: &DuckDbBackend,
    user_id: &str,
) -> Result<VisitFrequency> {
    let conn = db.conn.lock().await;

    let mut stmt = conn.prepare(
        r#"
        SELECT COUNT(*) AS total_visits,
               COUNT(DISTINCT CAST(created_at AS DATE)) AS active_days
        FROM events
        WHERE user_id = ?1
        "#,
    )?;
    let (total_visits, active_days): (i64, i64) =
        stmt.query_row(duckdb::params![user_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

    Ok(VisitFrequency {
        total_visits,
        active_days,
        avg_daily_visits: 0.0,
    })
}

/// Top pages among the user's `page_view` events, each with its share of
/// the user's page views.
pub async fn user_page_preference_inner(
    db: &DuckDbBackend,
    user_id: &str,
    limit: i64,
) -> Result<Vec<PagePreferenceRow>> {
    let conn = db.conn.lock().await;
    let page_expr = page_name_expr("properties");

    let sql = format!(
        r#"
        SELECT {page_expr} AS page_name,
               COUNT(*) AS visit_count,
               COUNT(*) * 100.0 / SUM(COUNT(*)) OVER () AS percentage
        FROM events
        WHERE user_id = ?1
          AND event_name = '{PAGE_VIEW_EVENT}'
          AND {page_expr} IS NOT NULL
        GROUP BY page_name
        ORDER BY visit_count DESC, page_name ASC
        LIMIT ?2
        "#
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![user_id, limit], |row| {
        Ok(PagePreferenceRow {
            page_name: row.get(0)?,
            visit_count: row.get(1)?,
            percentage: round2(row.get::<_, f64>(2)?),
        })
    })?;

    let mut preference = Vec::new();
    for row in rows {
        preference.push(row?);
    }
    Ok(preference)
}

/// Top event names by usage count, with distinct usage days.
pub async fn user_feature_usage_inner(
    db: &DuckDbBackend,
    user_id: &str,
    limit: i64,
) -> Result<Vec<FeatureUsageRow>> {
    let conn = db.conn.lock().await;

    let mut stmt = conn.prepare(
        r#"
        SELECT event_name,
               COUNT(*) AS usage_count,
               COUNT(DISTINCT CAST(created_at AS DATE)) AS usage_days
        FROM events
        WHERE user_id = ?1
        GROUP BY event_name
        ORDER BY usage_count DESC, event_name ASC
        LIMIT ?2
        "#,
    )?;
    let rows = stmt.query_map(duckdb::params![user_id, limit], |row| {
        Ok(FeatureUsageRow {
            event_name: row.get(0)?,
            usage_count: row.get(1)?,
            usage_days: row.get(2)?,
        })
    })?;

    let mut usage = Vec::new();
    for row in rows {
        usage.push(row?);
    }
    Ok(usage)
}

/// Every distinct non-null user_id in the event store, ordered for a
/// deterministic recompute sequence.
pub async fn distinct_user_ids_inner(db: &DuckDbBackend) -> Result<Vec<String>> {
    let conn = db.conn.lock().await;

    let mut stmt = conn.prepare(
        r#"
        SELECT DISTINCT user_id
        FROM events
        WHERE user_id IS NOT NULL
        ORDER BY user_id ASC
        "#,
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}
