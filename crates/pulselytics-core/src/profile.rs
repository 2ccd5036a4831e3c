//! Profile types and the pure classification/scoring formulas.
//!
//! Everything here is a deterministic function of one user's event
//! aggregates plus the evaluation instant — the backend supplies the
//! aggregates, the profiler composes the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::round2;

/// Aggregate row over one user's events, as observed at a recompute instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBasicInfo {
    pub user_id: String,
    pub register_time: DateTime<Utc>,
    pub last_active_time: DateTime<Utc>,
    pub total_events: i64,
    pub active_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTag {
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitFrequency {
    pub total_visits: i64,
    pub active_days: i64,
    pub avg_daily_visits: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagePreferenceRow {
    pub page_name: String,
    pub visit_count: i64,
    /// Share of this user's page views, 0–100, 2 decimal places.
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureUsageRow {
    pub event_name: String,
    pub usage_count: i64,
    pub usage_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorFeatures {
    pub visit_frequency: VisitFrequency,
    pub page_preference: Vec<PagePreferenceRow>,
    pub feature_usage: Vec<FeatureUsageRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestEntry {
    pub name: String,
    pub score: f64,
    #[serde(rename = "type")]
    pub source: InterestSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestSource {
    Page,
    Feature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAssessment {
    pub activity_score: i64,
    pub loyalty_score: i64,
    pub behavior_score: i64,
    pub time_score: i64,
    pub total_score: i64,
    pub level: String,
}

/// The derived profile row, overwritten on every recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub register_time: DateTime<Utc>,
    pub last_active_time: DateTime<Utc>,
    pub total_events: i64,
    pub active_days: i64,
    pub tags: Vec<UserTag>,
    pub behavior_features: BehaviorFeatures,
    pub value_assessment: ValueAssessment,
    pub activity_level: String,
    pub value_level: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subset served by the profile listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub user_id: String,
    pub register_time: DateTime<Utc>,
    pub last_active_time: DateTime<Utc>,
    pub total_events: i64,
    pub active_days: i64,
    pub activity_level: String,
    pub value_level: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub activity_level: Option<String>,
    pub value_level: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilesPage {
    pub rows: Vec<ProfileSummary>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// Whole days elapsed since registration, floored, never negative.
pub fn days_since_register(register_time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - register_time).num_days().max(0)
}

/// Activity classifier; also the profile's `activity_level`.
/// First matching rule wins, top to bottom.
pub fn activity_level(active_days: i64) -> &'static str {
    if active_days >= 20 {
        "high"
    } else if active_days >= 10 {
        "mid"
    } else {
        "low"
    }
}

pub fn loyalty_tag(days_since_register: i64, active_days: i64) -> &'static str {
    if days_since_register > 30 && active_days > 15 {
        "loyal"
    } else if days_since_register > 7 {
        "normal"
    } else {
        "new"
    }
}

pub fn value_tag(total_events: i64) -> &'static str {
    if total_events > 1000 {
        "high"
    } else if total_events > 500 {
        "mid"
    } else {
        "low"
    }
}

/// The three fixed-threshold tags derived from the basic aggregate row.
pub fn user_tags(info: &UserBasicInfo, now: DateTime<Utc>) -> Vec<UserTag> {
    let dsr = days_since_register(info.register_time, now);
    vec![
        UserTag {
            name: activity_level(info.active_days).to_string(),
            tag_type: "activity".to_string(),
        },
        UserTag {
            name: loyalty_tag(dsr, info.active_days).to_string(),
            tag_type: "loyalty".to_string(),
        },
        UserTag {
            name: value_tag(info.total_events).to_string(),
            tag_type: "value".to_string(),
        },
    ]
}

/// Value level from the composite score. Evaluated on the unrounded
/// composite — 79.6 is not "core".
pub fn value_level(total_score: f64) -> &'static str {
    if total_score >= 80.0 {
        "core"
    } else if total_score >= 60.0 {
        "important"
    } else if total_score >= 40.0 {
        "normal"
    } else if total_score >= 20.0 {
        "potential"
    } else {
        "churned"
    }
}

/// Four sub-scores capped at 100 and their arithmetic-mean composite.
///
/// `distinct_event_names` is the size of the user's feature-usage ranking
/// (top-10 capped, so the behavior sub-score saturates at 100 either way).
pub fn assess_value(
    info: &UserBasicInfo,
    distinct_event_names: i64,
    now: DateTime<Utc>,
) -> ValueAssessment {
    let dsr = days_since_register(info.register_time, now);

    let activity = (info.active_days as f64 * 5.0).min(100.0);
    let loyalty = (dsr as f64 * 0.5 + info.active_days as f64 * 2.0).min(100.0);
    let behavior = (distinct_event_names as f64 * 10.0).min(100.0);
    let time = (info.total_events as f64 * 0.1).min(100.0);

    let total = (activity + loyalty + behavior + time) / 4.0;

    ValueAssessment {
        activity_score: activity.round() as i64,
        loyalty_score: loyalty.round() as i64,
        behavior_score: behavior.round() as i64,
        time_score: time.round() as i64,
        total_score: total.round() as i64,
        level: value_level(total).to_string(),
    }
}

/// Merge page preferences (score = page-view share) and feature usage
/// (score = usage × 0.1) into one ranking. Pages win name collisions;
/// descending by score, top 10.
pub fn interest_profile(features: &BehaviorFeatures) -> Vec<InterestEntry> {
    let mut interests: Vec<InterestEntry> = features
        .page_preference
        .iter()
        .map(|page| InterestEntry {
            name: page.page_name.clone(),
            score: page.percentage,
            source: InterestSource::Page,
        })
        .collect();

    for feature in &features.feature_usage {
        if interests.iter().any(|entry| entry.name == feature.event_name) {
            continue;
        }
        interests.push(InterestEntry {
            name: feature.event_name.clone(),
            score: round2(feature.usage_count as f64 * 0.1),
            source: InterestSource::Feature,
        });
    }

    interests.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    interests.truncate(10);
    interests
}
