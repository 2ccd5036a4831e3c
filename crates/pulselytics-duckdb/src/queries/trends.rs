use anyhow::Result;

use pulselytics_core::analytics::{
    round2, DateRange, TrendInterval, TrendMetric, TrendPoint, PAGE_VIEW_EVENT,
};

use crate::queries::{date_floor, page_name_expr, range_bounds, trunc_expr};
use crate::DuckDbBackend;

/// Trend series: one point per distinct truncated timestamp present in the
/// range, ascending — empty buckets are not zero-filled. The metric selects
/// the aggregation formula; the interval selects the truncation unit
/// (ignored by `retention`, which buckets by first-visit date).
pub async fn get_trend_analysis_inner(
    db: &DuckDbBackend,
    metric: TrendMetric,
    range: DateRange,
    interval: TrendInterval,
) -> Result<Vec<TrendPoint>> {
    match metric {
        TrendMetric::Events => events_trend(db, range, interval).await,
        TrendMetric::Dau => dau_trend(db, range, interval).await,
        TrendMetric::PageViews => page_views_trend(db, range, interval).await,
        TrendMetric::UniqueUsers => unique_users_trend(db, range, interval).await,
        TrendMetric::Retention => retention_trend(db, range).await,
        TrendMetric::Performance => performance_trend(db, range, interval).await,
    }
}

async fn events_trend(
    db: &DuckDbBackend,
    range: DateRange,
    interval: TrendInterval,
) -> Result<Vec<TrendPoint>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = range_bounds(&range);
    let bucket = trunc_expr(interval);

    let sql = format!(
        r#"
        SELECT {bucket} AS time_bucket,
               COUNT(*) AS count,
               COUNT(DISTINCT user_id) AS unique_users
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
        GROUP BY time_bucket
        ORDER BY time_bucket ASC
        "#
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![start, end_next], |row| {
        Ok(TrendPoint::Events {
            time_bucket: row.get(0)?,
            count: row.get(1)?,
            unique_users: row.get(2)?,
        })
    })?;
    collect(rows)
}

async fn dau_trend(
    db: &DuckDbBackend,
    range: DateRange,
    interval: TrendInterval,
) -> Result<Vec<TrendPoint>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = range_bounds(&range);
    let bucket = trunc_expr(interval);

    let sql = format!(
        r#"
        SELECT {bucket} AS time_bucket,
               COUNT(DISTINCT user_id) AS dau,
               COUNT(*) AS total_events
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
          AND user_id IS NOT NULL
        GROUP BY time_bucket
        ORDER BY time_bucket ASC
        "#
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![start, end_next], |row| {
        Ok(TrendPoint::Dau {
            time_bucket: row.get(0)?,
            dau: row.get(1)?,
            total_events: row.get(2)?,
        })
    })?;
    collect(rows)
}

async fn page_views_trend(
    db: &DuckDbBackend,
    range: DateRange,
    interval: TrendInterval,
) -> Result<Vec<TrendPoint>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = range_bounds(&range);
    let bucket = trunc_expr(interval);
    let page_expr = page_name_expr("properties");

    let sql = format!(
        r#"
        SELECT {bucket} AS time_bucket,
               COUNT(*) AS page_views,
               COUNT(DISTINCT user_id) AS unique_visitors,
               COUNT(DISTINCT {page_expr}) AS unique_pages
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
          AND event_name = '{PAGE_VIEW_EVENT}'
          AND {page_expr} IS NOT NULL
        GROUP BY time_bucket
        ORDER BY time_bucket ASC
        "#
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![start, end_next], |row| {
        Ok(TrendPoint::PageViews {
            time_bucket: row.get(0)?,
            page_views: row.get(1)?,
            unique_visitors: row.get(2)?,
            unique_pages: row.get(3)?,
        })
    })?;
    collect(rows)
}

async fn unique_users_trend(
    db: &DuckDbBackend,
    range: DateRange,
    interval: TrendInterval,
) -> Result<Vec<TrendPoint>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = range_bounds(&range);
    let bucket = trunc_expr(interval);

    let sql = format!(
        r#"
        SELECT {bucket} AS time_bucket,
               COUNT(DISTINCT user_id) AS unique_users,
               COUNT(*) AS total_events
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
          AND user_id IS NOT NULL
        GROUP BY time_bucket
        ORDER BY time_bucket ASC
        "#
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![start, end_next], |row| {
        Ok(TrendPoint::UniqueUsers {
            time_bucket: row.get(0)?,
            unique_users: row.get(1)?,
            total_events: row.get(2)?,
        })
    })?;
    collect(rows)
}

/// Retention trend: cohorts keyed by first-visit date within range, counting
/// users who return exactly on day +1 and day +7. Synthetic
/// `anonymous_`-prefixed ids are excluded from cohorts.
async fn retention_trend(db: &DuckDbBackend, range: DateRange) -> Result<Vec<TrendPoint>> {
    let conn = db.conn.lock().await;
    let start = date_floor(range.start);
    let end = date_floor(range.end);

    let mut stmt = conn.prepare(
        r#"
        WITH first_visits AS (
            SELECT user_id, MIN(CAST(created_at AS DATE)) AS first_visit_date
            FROM events
            WHERE user_id IS NOT NULL
              AND user_id NOT LIKE 'anonymous_%'
            GROUP BY user_id
        ),
        daily_retention AS (
            SELECT f.first_visit_date AS time_bucket,
                   COUNT(DISTINCT f.user_id) AS new_users,
                   COUNT(DISTINCT CASE
                       WHEN CAST(e.created_at AS DATE) = f.first_visit_date + 1
                       THEN f.user_id END) AS day1_retained,
                   COUNT(DISTINCT CASE
                       WHEN CAST(e.created_at AS DATE) = f.first_visit_date + 7
                       THEN f.user_id END) AS day7_retained
            FROM first_visits f
            LEFT JOIN events e ON e.user_id = f.user_id
            WHERE f.first_visit_date >= CAST(?1 AS DATE)
              AND f.first_visit_date <= CAST(?2 AS DATE)
            GROUP BY f.first_visit_date
        )
        SELECT CAST(time_bucket AS VARCHAR),
               new_users,
               day1_retained,
               CASE WHEN new_users > 0 THEN day1_retained * 100.0 / new_users ELSE 0 END,
               day7_retained,
               CASE WHEN new_users > 0 THEN day7_retained * 100.0 / new_users ELSE 0 END
        FROM daily_retention
        ORDER BY time_bucket ASC
        "#,
    )?;
    let rows = stmt.query_map(duckdb::params![start, end], |row| {
        Ok(TrendPoint::Retention {
            time_bucket: row.get(0)?,
            new_users: row.get(1)?,
            day1_retained: row.get(2)?,
            day1_retention_rate: round2(row.get::<_, f64>(3)?),
            day7_retained: row.get(4)?,
            day7_retention_rate: round2(row.get::<_, f64>(5)?),
        })
    })?;
    collect(rows)
}

async fn performance_trend(
    db: &DuckDbBackend,
    range: DateRange,
    interval: TrendInterval,
) -> Result<Vec<TrendPoint>> {
    let conn = db.conn.lock().await;
    let (start, end_next) = range_bounds(&range);
    let bucket = trunc_expr(interval);

    let sql = format!(
        r#"
        SELECT {bucket} AS time_bucket,
               COUNT(*) AS total_events,
               COUNT(duration_ms) AS events_with_duration,
               COALESCE(AVG(duration_ms), 0) AS avg_duration,
               COALESCE(quantile_cont(duration_ms, 0.5), 0) AS median_duration,
               COALESCE(quantile_cont(duration_ms, 0.95), 0) AS p95_duration
        FROM events
        WHERE created_at >= ?1 AND created_at < ?2
        GROUP BY time_bucket
        ORDER BY time_bucket ASC
        "#
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(duckdb::params![start, end_next], |row| {
        Ok(TrendPoint::Performance {
            time_bucket: row.get(0)?,
            total_events: row.get(1)?,
            events_with_duration: row.get(2)?,
            avg_duration: round2(row.get::<_, f64>(3)?),
            median_duration: round2(row.get::<_, f64>(4)?),
            p95_duration: round2(row.get::<_, f64>(5)?),
        })
    })?;
    collect(rows)
}

fn collect<I>(rows: I) -> Result<Vec<TrendPoint>>
where
    I: Iterator<Item = duckdb::Result<TrendPoint>>,
{
    let mut points = Vec::new();
    for row in rows {
        points.push(row?);
    }
    Ok(points)
}
