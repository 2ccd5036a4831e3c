//! Trait implementations binding the DuckDB query layer to the core
//! interfaces. Validation happens here, at the store boundary; anything the
//! query layer raises is classified into the shared error taxonomy before it
//! crosses back into core.

use async_trait::async_trait;
use chrono::NaiveDate;

use pulselytics_core::analytics::{
    ActivityStats, AnalyticsBackend, DateRange, EventStatRow, PageViewRow, ProfileStore,
    RetentionStats, StatsResult, TrendInterval, TrendMetric, TrendPoint,
};
use pulselytics_core::error::StoreError;
use pulselytics_core::event::{EventFilter, EventsPage, NewEvent};
use pulselytics_core::profile::{
    FeatureUsageRow, PagePreferenceRow, ProfileFilter, ProfilesPage, UserBasicInfo, UserProfile,
    VisitFrequency,
};

use crate::backend::map_storage_error;
use crate::DuckDbBackend;

fn validate_event(event: &NewEvent) -> Result<(), StoreError> {
    if event.event_name.trim().is_empty() {
        return Err(StoreError::Validation(
            "event name is required".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl AnalyticsBackend for DuckDbBackend {
    async fn append(&self, event: &NewEvent) -> Result<i64, StoreError> {
        validate_event(event)?;
        self.append_inner(event).await.map_err(map_storage_error)
    }

    async fn append_batch(&self, events: &[NewEvent]) -> Result<Vec<i64>, StoreError> {
        if events.is_empty() {
            return Err(StoreError::Validation(
                "events batch must not be empty".to_string(),
            ));
        }
        // Reject the whole batch before touching storage — no partial writes.
        for event in events {
            validate_event(event)?;
        }
        self.append_batch_inner(events)
            .await
            .map_err(map_storage_error)
    }

    async fn query_events(
        &self,
        filter: &EventFilter,
        page: i64,
        page_size: i64,
    ) -> Result<EventsPage, StoreError> {
        crate::queries::events::query_events_inner(self, filter, page, page_size)
            .await
            .map_err(map_storage_error)
    }

    async fn stats(
        &self,
        event_type: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<StatsResult, StoreError> {
        crate::queries::stats::get_stats_inner(self, event_type, start, end)
            .await
            .map_err(map_storage_error)
    }

    async fn activity_stats(&self, range: DateRange) -> Result<ActivityStats, StoreError> {
        crate::queries::activity::get_activity_stats_inner(self, range)
            .await
            .map_err(map_storage_error)
    }

    async fn retention_stats(&self, window_days: u32) -> Result<RetentionStats, StoreError> {
        crate::queries::retention::get_retention_stats_inner(self, window_days)
            .await
            .map_err(map_storage_error)
    }

    async fn page_view_stats(&self, range: DateRange) -> Result<Vec<PageViewRow>, StoreError> {
        crate::queries::page_views::get_page_view_stats_inner(self, range)
            .await
            .map_err(map_storage_error)
    }

    async fn event_stats(
        &self,
        range: DateRange,
        limit: i64,
    ) -> Result<Vec<EventStatRow>, StoreError> {
        crate::queries::page_views::get_event_stats_inner(self, range, limit)
            .await
            .map_err(map_storage_error)
    }

    async fn trend_analysis(
        &self,
        metric: TrendMetric,
        range: DateRange,
        interval: TrendInterval,
    ) -> Result<Vec<TrendPoint>, StoreError> {
        crate::queries::trends::get_trend_analysis_inner(self, metric, range, interval)
            .await
            .map_err(map_storage_error)
    }

    async fn user_basic_info(
        &self,
        user_id: &str,
    ) -> Result<Option<UserBasicInfo>, StoreError> {
        crate::queries::profile::user_basic_info_inner(self, user_id)
            .await
            .map_err(map_storage_error)
    }

    async fn user_visit_frequency(&self, user_id: &str) -> Result<VisitFrequency, StoreError> {
        crate::queries::profile::user_visit_frequency_inner(self, user_id)
            .await
            .map_err(map_storage_error)
    }

    async fn user_page_preference(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<PagePreferenceRow>, StoreError> {
        crate::queries::profile::user_page_preference_inner(self, user_id, limit)
            .await
            .map_err(map_storage_error)
    }

    async fn user_feature_usage(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<FeatureUsageRow>, StoreError> {
        crate::queries::profile::user_feature_usage_inner(self, user_id, limit)
            .await
            .map_err(map_storage_error)
    }

    async fn distinct_user_ids(&self) -> Result<Vec<String>, StoreError> {
        crate::queries::profile::distinct_user_ids_inner(self)
            .await
            .map_err(map_storage_error)
    }
}

#[async_trait]
impl ProfileStore for DuckDbBackend {
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        if profile.user_id.is_empty() {
            return Err(StoreError::Validation(
                "profile user_id must not be empty".to_string(),
            ));
        }
        crate::profile_store::upsert_profile_inner(self, profile)
            .await
            .map_err(map_storage_error)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        crate::profile_store::get_profile_inner(self, user_id)
            .await
            .map_err(map_storage_error)
    }

    async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        page: i64,
        page_size: i64,
    ) -> Result<ProfilesPage, StoreError> {
        crate::profile_store::list_profiles_inner(self, filter, page, page_size)
            .await
            .map_err(map_storage_error)
    }
}
