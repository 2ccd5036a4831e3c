use anyhow::Result;

use pulselytics_core::analytics::{
    round2, ActivityStats, ConversionRow, DateRange, DauPoint, MauPoint,
    CONVERSION_TARGET_EVENTS, PAGE_VIEW_EVENT,
};

use crate::queries::range_bounds;
use crate::DuckDbBackend;

/// DAU, MAU, and page-view conversion rates over an inclusive date range.
///
/// Three independent sub-queries under one connection lock; no snapshot
/// isolation is promised across them under concurrent ingestion.
pub async fn get_activity_stats_inner(
    db: &DuckDbBackend,
    range: DateRange,
) -> Result<ActivityStats> {
    let conn = db.conn.lock().await;
    let (start, end_next) = range_bounds(&range);

    let mut stmt = conn.prepare(
        r#"
        SELECT CAST(CAST(created_at AS DATE) AS VARCHAR) AS date,
               COUNT(DISTINCT user_id) AS dau
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
          AND user_id IS NOT NULL
        GROUP BY date
        ORDER BY date ASC
        "#,
    )?;
    let rows = stmt.query_map(duckdb::params![start, end_next], |row| {
        Ok(DauPoint {
            date: row.get(0)?,
            dau: row.get(1)?,
        })
    })?;
    let mut dau = Vec::new();
    for row in rows {
        dau.push(row?);
    }

    let mut stmt = conn.prepare(
        r#"
        SELECT CAST(CAST(date_trunc('month', created_at) AS DATE) AS VARCHAR) AS month,
               COUNT(DISTINCT user_id) AS mau
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
          AND user_id IS NOT NULL
        GROUP BY month
        ORDER BY month ASC
        "#,
    )?;
    let rows = stmt.query_map(duckdb::params![start, end_next], |row| {
        Ok(MauPoint {
            month: row.get(0)?,
            mau: row.get(1)?,
        })
    })?;
    let mut mau = Vec::new();
    for row in rows {
        mau.push(row?);
    }

    // Conversion: cohort = distinct page_view users in range; a target event
    // converts the share of the cohort that also fired it.
    let target_list = CONVERSION_TARGET_EVENTS
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");
    let conversion_sql = format!(
        r#"
        WITH page_view_users AS (
            SELECT DISTINCT user_id
            FROM events
            WHERE created_at >= ?1 AND created_at < ?2
              AND event_name = '{PAGE_VIEW_EVENT}'
              AND user_id IS NOT NULL
        ),
        key_events AS (
            SELECT e.event_name, COUNT(DISTINCT e.user_id) AS user_count
            FROM events e
            JOIN page_view_users p ON p.user_id = e.user_id
            WHERE e.created_at >= ?1 AND e.created_at < ?2
              AND e.event_name IN ({target_list})
            GROUP BY e.event_name
        ),
        total_users AS (
            SELECT COUNT(*) AS total FROM page_view_users
        )
        SELECT k.event_name, k.user_count, t.total,
               CASE WHEN t.total = 0 THEN 0
                    ELSE k.user_count * 100.0 / t.total END AS conversion_rate
        FROM key_events k
        CROSS JOIN total_users t
        ORDER BY conversion_rate DESC, k.event_name ASC
        "#
    );
    let mut stmt = conn.prepare(&conversion_sql)?;
    let rows = stmt.query_map(duckdb::params![start, end_next], |row| {
        Ok(ConversionRow {
            event_name: row.get(0)?,
            user_count: row.get(1)?,
            total_users: row.get(2)?,
            conversion_rate: row.get::<_, f64>(3)?,
        })
    })?;
    let mut conversion_rate = Vec::new();
    for row in rows {
        let mut row = row?;
        row.conversion_rate = round2(row.conversion_rate);
        conversion_rate.push(row);
    }

    Ok(ActivityStats {
        dau,
        mau,
        conversion_rate,
    })
}
