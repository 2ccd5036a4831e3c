use anyhow::Result;

use pulselytics_core::analytics::{DateRange, EventStatRow, PageViewRow, PAGE_VIEW_EVENT};

use crate::queries::{page_name_expr, range_bounds};
use crate::DuckDbBackend;

const PAGE_VIEW_LIMIT: i64 = 20;

/// Top pages by pv among `page_view` events, with distinct-visitor counts.
pub async fn get_page_view_stats_inner(
    db: &DuckDbBackend,
    range: DateRange,
) -> Result<Vec<PageViewRow>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = range_bounds(&range);
    let page_expr = page_name_expr("properties");

    let sql = format!(
        r#"
        SELECT {page_expr} AS page_url,
               COUNT(*) AS pv,
               COUNT(DISTINCT user_id) AS uv
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
          AND event_name = '{PAGE_VIEW_EVENT}'
          AND {page_expr} IS NOT NULL
        GROUP BY page_url
        ORDER BY pv DESC, page_url ASC
        LIMIT ?3
        "#
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![start, end_next, PAGE_VIEW_LIMIT], |row| {
        Ok(PageViewRow {
            page_url: row.get(0)?,
            pv: row.get(1)?,
            uv: row.get(2)?,
        })
    })?;

    let mut stats = Vec::new();
    for row in rows {
        stats.push(row?);
    }
    Ok(stats)
}

/// Top `limit` event names by count, with distinct-user counts.
pub async fn get_event_stats_inner(
    db: &DuckDbBackend,
    range: DateRange,
    limit: i64,
) -> Result<Vec<EventStatRow>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = range_bounds(&range);

    let mut stmt = conn.prepare(
        r#"
        SELECT event_name,
               COUNT(*) AS count,
               COUNT(DISTINCT user_id) AS unique_users
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
        GROUP BY event_name
        ORDER BY count DESC, event_name ASC
        LIMIT ?3
        "#,
    )?;
    let rows = stmt.query_map(duckdb::params![start, end_next, limit.max(1)], |row| {
        Ok(EventStatRow {
            event_name: row.get(0)?,
            count: row.get(1)?,
            unique_users: row.get(2)?,
        })
    })?;

    let mut stats = Vec::new();
    for row in rows {
        stats.push(row?);
    }
    Ok(stats)
}
