use anyhow::Result;
use duckdb::Connection;

use pulselytics_core::analytics::{round2, RetentionStats, LOGIN_EVENT};

use crate::DuckDbBackend;

/// Retention of the first-login cohort for the 1/7/30-day windows.
///
/// Cohort rule, preserved literally: a user's cohort date is the first
/// calendar date with a `login_success` event; the user is retained in an
/// N-day window iff they have ≥2 distinct login dates within
/// `[first_date, first_date + N]` — the first day itself counts toward the
/// two. An empty cohort yields 0, never an error.
pub async fn get_retention_stats_inner(
    db: &DuckDbBackend,
    window_days: u32,
) -> Result<RetentionStats> {
    let conn = db.conn.lock().await;

    let day1_retention = window_retention_rate(&conn, 1)?;
    let day7_retention = window_retention_rate(&conn, 7)?;
    let day30_retention = window_retention_rate(&conn, 30)?;

    Ok(RetentionStats {
        window_days,
        day1_retention,
        day7_retention,
        day30_retention,
    })
}

fn window_retention_rate(conn: &Connection, window_days: i64) -> Result<f64> {
    let sql = format!(
        r#"
        WITH user_first_login AS (
            SELECT user_id, MIN(CAST(created_at AS DATE)) AS first_date
            FROM events
            WHERE event_name = '{LOGIN_EVENT}'
              AND user_id IS NOT NULL
            GROUP BY user_id
        ),
        user_login_days AS (
            SELECT f.user_id,
                   COUNT(DISTINCT CAST(e.created_at AS DATE)) AS login_days
            FROM user_first_login f
            LEFT JOIN events e
              ON e.user_id = f.user_id
             AND e.event_name = '{LOGIN_EVENT}'
             AND CAST(e.created_at AS DATE) >= f.first_date
             AND CAST(e.created_at AS DATE) <= f.first_date + ?1
            GROUP BY f.user_id
        )
        SELECT CASE WHEN COUNT(*) = 0 THEN 0
                    ELSE COUNT(CASE WHEN login_days >= 2 THEN 1 END) * 100.0 / COUNT(*)
               END AS retention
        FROM user_login_days
        "#
    );
    let rate: f64 = conn
        .prepare(&sql)?
        .query_row(duckdb::params![window_days], |row| row.get(0))?;
    Ok(round2(rate))
}
