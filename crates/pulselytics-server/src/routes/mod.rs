pub mod activity;
pub mod collect;
pub mod events;
pub mod health;
pub mod page_views;
pub mod profiles;
pub mod retention;
pub mod stats;
pub mod trends;

use chrono::NaiveDate;

use pulselytics_core::analytics::DateRange;

use crate::error::AppError;

/// Parse an optional `YYYY-MM-DD` query value, ignoring malformed input the
/// way the listing endpoints tolerate it.
pub(crate) fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Date range for the endpoints that require explicit bounds: missing or
/// malformed dates are a validation error.
pub(crate) fn required_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<DateRange, AppError> {
    let (Some(start), Some(end)) = (parse_date(start), parse_date(end)) else {
        return Err(AppError::Validation(
            "start_date and end_date are required (YYYY-MM-DD)".to_string(),
        ));
    };
    DateRange::new(start, end).map_err(AppError::from)
}
