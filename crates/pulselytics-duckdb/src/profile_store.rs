//! Persistence for derived user profiles.
//!
//! One row per user, keyed by `user_id`. The upsert overwrites every derived
//! column but preserves `created_at`, so re-running a recompute with
//! unchanged events leaves an identical row apart from `updated_at`.

use anyhow::Result;

use pulselytics_core::event::total_pages;
use pulselytics_core::profile::{
    BehaviorFeatures, ProfileFilter, ProfileSummary, ProfilesPage, UserProfile, UserTag,
    ValueAssessment,
};

use crate::queries::parse_timestamp;
use crate::DuckDbBackend;

const MAX_PAGE_SIZE: i64 = 200;

pub async fn upsert_profile_inner(db: &DuckDbBackend, profile: &UserProfile) -> Result<()> {
    let tags = serde_json::to_string(&profile.tags)?;
    let behavior_features = serde_json::to_string(&profile.behavior_features)?;
    let value_assessment = serde_json::to_string(&profile.value_assessment)?;

    let conn = db.conn.lock().await;
    conn.execute(
        r#"
        INSERT INTO user_profiles (
            user_id, register_time, last_active_time, total_events, active_days,
            tags, behavior_features, value_assessment, activity_level, value_level,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                  CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT (user_id) DO UPDATE SET
            register_time = EXCLUDED.register_time,
            last_active_time = EXCLUDED.last_active_time,
            total_events = EXCLUDED.total_events,
            active_days = EXCLUDED.active_days,
            tags = EXCLUDED.tags,
            behavior_features = EXCLUDED.behavior_features,
            value_assessment = EXCLUDED.value_assessment,
            activity_level = EXCLUDED.activity_level,
            value_level = EXCLUDED.value_level,
            updated_at = CURRENT_TIMESTAMP
        "#,
        duckdb::params![
            profile.user_id,
            profile.register_time.to_rfc3339(),
            profile.last_active_time.to_rfc3339(),
            profile.total_events,
            profile.active_days,
            tags,
            behavior_features,
            value_assessment,
            profile.activity_level,
            profile.value_level,
        ],
    )?;
    Ok(())
}

pub async fn get_profile_inner(
    db: &DuckDbBackend,
    user_id: &str,
) -> Result<Option<UserProfile>> {
    let conn = db.conn.lock().await;

    let mut stmt = conn.prepare(
        r#"
        SELECT user_id,
               CAST(register_time AS VARCHAR),
               CAST(last_active_time AS VARCHAR),
               total_events, active_days,
               tags, behavior_features, value_assessment,
               activity_level, value_level,
               CAST(created_at AS VARCHAR),
               CAST(updated_at AS VARCHAR)
        FROM user_profiles
        WHERE user_id = ?1
        "#,
    )?;
    let row = stmt
        .query_row(duckdb::params![user_id], |row| {
            Ok(RawProfileRow {
                user_id: row.get(0)?,
                register_time: row.get(1)?,
                last_active_time: row.get(2)?,
                total_events: row.get(3)?,
                active_days: row.get(4)?,
                tags: row.get(5)?,
                behavior_features: row.get(6)?,
                value_assessment: row.get(7)?,
                activity_level: row.get(8)?,
                value_level: row.get(9)?,
                created_at: row.get(10)?,
                updated_at: row.get(11)?,
            })
        })
        .map(Some)
        .or_else(|err| match err {
            duckdb::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    row.map(RawProfileRow::into_profile).transpose()
}

pub async fn list_profiles_inner(
    db: &DuckDbBackend,
    filter: &ProfileFilter,
    page: i64,
    page_size: i64,
) -> Result<ProfilesPage> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

    let conn = db.conn.lock().await;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    if let Some(ref activity_level) = filter.activity_level {
        filter_sql.push_str(&format!(" AND activity_level = ?{param_idx}"));
        params.push(Box::new(activity_level.clone()));
        param_idx += 1;
    }
    if let Some(ref value_level) = filter.value_level {
        filter_sql.push_str(&format!(" AND value_level = ?{param_idx}"));
        params.push(Box::new(value_level.clone()));
        param_idx += 1;
    }

    let param_refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let total_sql = format!("SELECT COUNT(*) FROM user_profiles WHERE 1=1{filter_sql}");
    let total: i64 = conn
        .prepare(&total_sql)?
        .query_row(param_refs.as_slice(), |row| row.get(0))?;

    let rows_sql = format!(
        r#"
        SELECT user_id,
               CAST(register_time AS VARCHAR),
               CAST(last_active_time AS VARCHAR),
               total_events, active_days, activity_level, value_level
        FROM user_profiles
        WHERE 1=1{filter_sql}
        ORDER BY last_active_time DESC, user_id ASC
        LIMIT ?{param_idx} OFFSET ?{next_idx}
        "#,
        next_idx = param_idx + 1
    );

    let limit_param: Box<dyn duckdb::types::ToSql> = Box::new(page_size);
    let offset_param: Box<dyn duckdb::types::ToSql> = Box::new((page - 1) * page_size);
    let mut row_params = param_refs.clone();
    row_params.push(limit_param.as_ref());
    row_params.push(offset_param.as_ref());

    let mut stmt = conn.prepare(&rows_sql)?;
    let mapped = stmt.query_map(row_params.as_slice(), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut rows = Vec::new();
    for raw in mapped {
        let (user_id, register, last_active, total_events, active_days, activity, value) = raw?;
        rows.push(ProfileSummary {
            user_id,
            register_time: parse_timestamp(&register)?,
            last_active_time: parse_timestamp(&last_active)?,
            total_events,
            active_days,
            activity_level: activity,
            value_level: value,
        });
    }

    Ok(ProfilesPage {
        rows,
        total,
        page,
        page_size,
        total_pages: total_pages(total, page_size),
    })
}

struct RawProfileRow {
    user_id: String,
    register_time: String,
    last_active_time: String,
    total_events: i64,
    active_days: i64,
    tags: String,
    behavior_features: String,
    value_assessment: String,
    activity_level: String,
    value_level: String,
    created_at: String,
    updated_at: String,
}

impl RawProfileRow {
    fn into_profile(self) -> Result<UserProfile> {
        let tags: Vec<UserTag> = serde_json::from_str(&self.tags)?;
        let behavior_features: BehaviorFeatures = serde_json::from_str(&self.behavior_features)?;
        let value_assessment: ValueAssessment = serde_json::from_str(&self.value_assessment)?;
        Ok(UserProfile {
            user_id: self.user_id,
            register_time: parse_timestamp(&self.register_time)?,
            last_active_time: parse_timestamp(&self.last_active_time)?,
            total_events: self.total_events,
            active_days: self.active_days,
            tags,
            behavior_features,
            value_assessment,
            activity_level: self.activity_level,
            value_level: self.value_level,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}
