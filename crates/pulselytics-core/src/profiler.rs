//! The profiling engine: composes per-user aggregates from the analytics
//! backend into tags, behavior features, an interest ranking, and a value
//! assessment, and upserts the result through the profile store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::analytics::{round2, AnalyticsBackend, ProfileStore};
use crate::error::StoreError;
use crate::profile::{
    activity_level, assess_value, interest_profile, user_tags, BehaviorFeatures, InterestEntry,
    UserBasicInfo, UserProfile, UserTag, ValueAssessment,
};

const RANKING_LIMIT: i64 = 10;

/// Summary of one `recompute_all` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RecomputeSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

/// Recomputes profiles from the event store.
///
/// Stateless apart from the two store handles; the same events always
/// produce the same profile (the evaluation instant only shifts the
/// tenure-derived numbers).
#[derive(Clone)]
pub struct Profiler {
    events: Arc<dyn AnalyticsBackend>,
    profiles: Arc<dyn ProfileStore>,
}

impl Profiler {
    pub fn new(events: Arc<dyn AnalyticsBackend>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { events, profiles }
    }

    pub async fn basic_info(&self, user_id: &str) -> Result<Option<UserBasicInfo>, StoreError> {
        self.events.user_basic_info(user_id).await
    }

    /// Three fixed-threshold tags; empty for unknown users (not an error).
    pub async fn tags(&self, user_id: &str) -> Result<Vec<UserTag>, StoreError> {
        match self.events.user_basic_info(user_id).await? {
            Some(info) => Ok(user_tags(&info, Utc::now())),
            None => Ok(Vec::new()),
        }
    }

    pub async fn behavior_features(&self, user_id: &str) -> Result<BehaviorFeatures, StoreError> {
        let mut visit_frequency = self.events.user_visit_frequency(user_id).await?;
        visit_frequency.avg_daily_visits = if visit_frequency.active_days == 0 {
            0.0
        } else {
            round2(visit_frequency.total_visits as f64 / visit_frequency.active_days as f64)
        };

        let page_preference = self
            .events
            .user_page_preference(user_id, RANKING_LIMIT)
            .await?;
        let feature_usage = self.events.user_feature_usage(user_id, RANKING_LIMIT).await?;

        Ok(BehaviorFeatures {
            visit_frequency,
            page_preference,
            feature_usage,
        })
    }

    pub async fn interest_profile(&self, user_id: &str) -> Result<Vec<InterestEntry>, StoreError> {
        let features = self.behavior_features(user_id).await?;
        Ok(interest_profile(&features))
    }

    pub async fn value_assessment(
        &self,
        user_id: &str,
    ) -> Result<Option<ValueAssessment>, StoreError> {
        let Some(info) = self.events.user_basic_info(user_id).await? else {
            return Ok(None);
        };
        let feature_usage = self.events.user_feature_usage(user_id, RANKING_LIMIT).await?;
        Ok(Some(assess_value(
            &info,
            feature_usage.len() as i64,
            Utc::now(),
        )))
    }

    /// Full profile assembled live from the event store (not the stored
    /// row); `None` for unknown users.
    pub async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        self.build(user_id).await
    }

    /// Recompute and upsert one profile. `None` (and no write) when the
    /// user has no events. Idempotent for an unchanged event set.
    pub async fn recompute(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let Some(profile) = self.build(user_id).await? else {
            return Ok(None);
        };
        self.profiles.upsert_profile(&profile).await?;
        Ok(Some(profile))
    }

    /// Recompute every known user, isolating per-user failures.
    ///
    /// A `Validation` error is an invariant breach (an empty user_id in the
    /// distinct list) and aborts the pass; anything else is logged, counted
    /// as failed, and the loop continues.
    pub async fn recompute_all(&self) -> Result<RecomputeSummary, StoreError> {
        let users = self.events.distinct_user_ids().await?;
        let total = users.len();
        info!(total, "starting profile recompute for all users");

        let mut success = 0usize;
        let mut failed = 0usize;
        for user_id in &users {
            if user_id.is_empty() {
                return Err(StoreError::Validation(
                    "empty user_id in distinct user list".to_string(),
                ));
            }
            match self.recompute(user_id).await {
                Ok(_) => success += 1,
                Err(err @ StoreError::Validation(_)) => return Err(err),
                Err(err) => {
                    error!(user_id = %user_id, error = %err, "profile recompute failed, skipping user");
                    failed += 1;
                }
            }
        }

        info!(total, success, failed, "profile recompute completed");
        Ok(RecomputeSummary {
            total,
            success,
            failed,
        })
    }

    async fn build(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let Some(info) = self.events.user_basic_info(user_id).await? else {
            return Ok(None);
        };
        let now = Utc::now();

        let tags = user_tags(&info, now);
        let behavior_features = self.behavior_features(user_id).await?;
        let value_assessment =
            assess_value(&info, behavior_features.feature_usage.len() as i64, now);

        Ok(Some(UserProfile {
            user_id: info.user_id.clone(),
            register_time: info.register_time,
            last_active_time: info.last_active_time,
            total_events: info.total_events,
            active_days: info.active_days,
            tags,
            activity_level: activity_level(info.active_days).to_string(),
            value_level: value_assessment.level.clone(),
            behavior_features,
            value_assessment,
            created_at: now,
            updated_at: now,
        }))
    }
}
