//! Aggregation backend abstraction.
//!
//! The trait keeps the aggregation formulas storage-agnostic: result shapes
//! and metric/interval vocabularies live here, while time-bucket truncation
//! and JSON-field extraction are implementation details of the backend crate.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::event::{EventFilter, EventsPage, NewEvent};
use crate::profile::{
    FeatureUsageRow, PagePreferenceRow, ProfileFilter, ProfilesPage, UserBasicInfo, UserProfile,
    VisitFrequency,
};

/// Event name that defines the conversion cohort and page aggregation.
pub const PAGE_VIEW_EVENT: &str = "page_view";

/// Event name whose first occurrence anchors retention cohorts.
pub const LOGIN_EVENT: &str = "login_success";

/// The fixed target set for conversion-rate rows.
pub const CONVERSION_TARGET_EVENTS: &[&str] = &[
    "login_success",
    "register_success",
    "purchase_success",
    "button_click",
];

/// Inclusive calendar-date bounds for an aggregation window.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, StoreError> {
        if end < start {
            return Err(StoreError::Validation(
                "end_date must be on or after start_date".to_string(),
            ));
        }
        Ok(Self { start, end })
    }
}

/// Round a ratio or score to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage `numerator / denominator * 100`, 2 decimal places, 0 when the
/// denominator is zero. Ratios never produce NaN or an error.
pub fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 * 100.0 / denominator as f64)
}

#[derive(Debug, Clone, Serialize)]
pub struct EventNameCount {
    pub event_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyBucket {
    pub hour: String,
    pub count: i64,
}

/// Output of `stats`: total, per-name ranking, and the trailing-24h series.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResult {
    pub total: i64,
    pub by_event_name: Vec<EventNameCount>,
    pub recent_trend: Vec<HourlyBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DauPoint {
    pub date: String,
    pub dau: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MauPoint {
    pub month: String,
    pub mau: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionRow {
    pub event_name: String,
    pub user_count: i64,
    pub total_users: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub dau: Vec<DauPoint>,
    pub mau: Vec<MauPoint>,
    pub conversion_rate: Vec<ConversionRow>,
}

/// Retention of the first-login cohort. All three windows are computed on
/// every call; `window_days` echoes which one the caller asked about.
#[derive(Debug, Clone, Serialize)]
pub struct RetentionStats {
    pub window_days: u32,
    pub day1_retention: f64,
    pub day7_retention: f64,
    pub day30_retention: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageViewRow {
    pub page_url: String,
    pub pv: i64,
    pub uv: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventStatRow {
    pub event_name: String,
    pub count: i64,
    pub unique_users: i64,
}

/// Time-bucket granularity for trend series. Unknown input falls back to day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendInterval {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl TrendInterval {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("hour") => Self::Hour,
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            _ => Self::Day,
        }
    }
}

/// Trend metric selector. Unknown input falls back to `events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    #[default]
    Events,
    Dau,
    PageViews,
    UniqueUsers,
    Retention,
    Performance,
}

impl TrendMetric {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("dau") => Self::Dau,
            Some("page_views") => Self::PageViews,
            Some("unique_users") => Self::UniqueUsers,
            Some("retention") => Self::Retention,
            Some("performance") => Self::Performance,
            _ => Self::Events,
        }
    }
}

/// One bucket of a trend series; the shape depends on the metric.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TrendPoint {
    Events {
        time_bucket: String,
        count: i64,
        unique_users: i64,
    },
    Dau {
        time_bucket: String,
        dau: i64,
        total_events: i64,
    },
    PageViews {
        time_bucket: String,
        page_views: i64,
        unique_visitors: i64,
        unique_pages: i64,
    },
    UniqueUsers {
        time_bucket: String,
        unique_users: i64,
        total_events: i64,
    },
    Retention {
        time_bucket: String,
        new_users: i64,
        day1_retained: i64,
        day1_retention_rate: f64,
        day7_retained: i64,
        day7_retention_rate: f64,
    },
    Performance {
        time_bucket: String,
        total_events: i64,
        events_with_duration: i64,
        avg_duration: f64,
        median_duration: f64,
        p95_duration: f64,
    },
}

/// Storage interface for the event store and every aggregation over it.
///
/// Implementations read fresh on every call — no caching, no snapshot
/// isolation across multi-query operations.
#[async_trait]
pub trait AnalyticsBackend: Send + Sync + 'static {
    /// Persist one validated event; returns its monotonic id.
    async fn append(&self, event: &NewEvent) -> Result<i64, StoreError>;

    /// Persist a batch atomically — either every event is stored or none is.
    async fn append_batch(&self, events: &[NewEvent]) -> Result<Vec<i64>, StoreError>;

    /// Paginated listing, newest first. `page` is 1-indexed.
    async fn query_events(
        &self,
        filter: &EventFilter,
        page: i64,
        page_size: i64,
    ) -> Result<EventsPage, StoreError>;

    async fn stats(
        &self,
        event_type: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<StatsResult, StoreError>;

    async fn activity_stats(&self, range: DateRange) -> Result<ActivityStats, StoreError>;

    async fn retention_stats(&self, window_days: u32) -> Result<RetentionStats, StoreError>;

    /// Top 20 pages by pv among `page_view` events.
    async fn page_view_stats(&self, range: DateRange) -> Result<Vec<PageViewRow>, StoreError>;

    async fn event_stats(
        &self,
        range: DateRange,
        limit: i64,
    ) -> Result<Vec<EventStatRow>, StoreError>;

    async fn trend_analysis(
        &self,
        metric: TrendMetric,
        range: DateRange,
        interval: TrendInterval,
    ) -> Result<Vec<TrendPoint>, StoreError>;

    /// Single aggregate row over one user's events; `None` for unknown users.
    async fn user_basic_info(&self, user_id: &str)
        -> Result<Option<UserBasicInfo>, StoreError>;

    async fn user_visit_frequency(&self, user_id: &str) -> Result<VisitFrequency, StoreError>;

    /// Top `limit` pages among the user's `page_view` events, with each
    /// page's share of the user's page views.
    async fn user_page_preference(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<PagePreferenceRow>, StoreError>;

    /// Top `limit` event names by usage count, with distinct usage days.
    async fn user_feature_usage(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<FeatureUsageRow>, StoreError>;

    /// Every distinct non-null user_id ever seen in the event store.
    async fn distinct_user_ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Persistence for derived profiles, upserted one row per user.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    /// Insert or overwrite the profile row keyed by `user_id`. `created_at`
    /// survives the upsert; `updated_at` advances.
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Stored profiles, `last_active_time DESC`, 1-indexed pagination.
    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        page: i64,
        page_size: i64,
    ) -> Result<ProfilesPage, StoreError>;
}
