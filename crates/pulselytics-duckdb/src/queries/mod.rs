//! SQL aggregation queries.
//!
//! Each module owns one operation family and builds its SQL from two shared
//! helpers: [`trunc_expr`] for time bucketing and [`page_name_expr`] for
//! JSON-field extraction. The formulas themselves (cohort rules, rounding,
//! tie-breaks) live in `pulselytics-core`; this layer only evaluates them.

pub mod activity;
pub mod events;
pub mod page_views;
pub mod profile;
pub mod retention;
pub mod stats;
pub mod trends;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use pulselytics_core::analytics::{DateRange, TrendInterval};

/// Half-open UTC timestamp bounds for an inclusive calendar-date range:
/// `created_at >= start 00:00 AND created_at < end + 1 day`.
pub(crate) fn range_bounds(range: &DateRange) -> (String, String) {
    (date_floor(range.start), date_floor(range.end + chrono::Duration::days(1)))
}

pub(crate) fn date_floor(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `date_trunc` expression for a trend interval. The unit comes from a fixed
/// vocabulary, never from caller input.
pub(crate) fn trunc_expr(interval: TrendInterval) -> String {
    let unit = match interval {
        TrendInterval::Hour => "hour",
        TrendInterval::Day => "day",
        TrendInterval::Week => "week",
        TrendInterval::Month => "month",
    };
    format!("CAST(date_trunc('{unit}', created_at) AS VARCHAR)")
}

/// Extraction expression for the canonical page key in the properties JSON.
pub(crate) fn page_name_expr(column: &str) -> String {
    format!("json_extract_string({column}, '$.page_name')")
}

/// Parse a `CAST(… AS VARCHAR)` timestamp back into UTC. DuckDB renders
/// timestamps as `YYYY-MM-DD HH:MM:SS[.ffffff]`.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")?;
    Ok(naive.and_utc())
}
