use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The payload the client sends to POST /api/events.
/// Wire field "event" maps to event_name in storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventInput {
    pub event: Option<String>,
    pub event_type: Option<String>,
    pub properties: Option<EventProperties>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    /// Duration in milliseconds, e.g. a page dwell time or an API latency.
    #[serde(rename = "duration")]
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    /// Explicit ingestion timestamp for log replay. Normally absent; when
    /// absent the store assigns the write time.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Event properties: one typed field for the canonical page key plus a raw
/// fallback map for everything else the client sends.
///
/// `page_name` is the single key all page aggregation reads — there is no
/// fallback to any other key (see DESIGN.md). Unknown keys round-trip
/// through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventProperties {
    /// Safe lookup into the raw property map. Absent keys are `None`, never
    /// a panic. `page_name` has its own typed field and is not mirrored here.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.page_name.is_none() && self.extra.is_empty()
    }
}

/// A validated event ready for the store, with ingestion context attached.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_name: String,
    pub event_type: String,
    pub properties: Option<EventProperties>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: String,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    /// Validate an ingestion payload and attach request context.
    ///
    /// Fails with [`StoreError::Validation`] when the event name is missing
    /// or empty. `created_at` honours the payload's replay timestamp when
    /// present, otherwise `now`.
    pub fn from_input(
        input: EventInput,
        ip: Option<String>,
        user_agent: Option<String>,
        request_id: String,
        now: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let event_name = match input.event {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(StoreError::Validation(
                    "event name is required".to_string(),
                ))
            }
        };

        Ok(Self {
            event_name,
            event_type: input
                .event_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "custom".to_string()),
            properties: input.properties.filter(|p| !p.is_empty()),
            user_id: input.user_id.filter(|u| !u.is_empty()),
            session_id: input.session_id,
            duration_ms: input.duration_ms,
            error_message: input.error_message,
            ip,
            user_agent,
            request_id,
            created_at: input.timestamp.unwrap_or(now),
        })
    }
}

/// The stored, immutable event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic id assigned by the store at insert time.
    pub id: i64,
    pub event_name: String,
    pub event_type: String,
    pub properties: Option<EventProperties>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: String,
    pub created_at: DateTime<Utc>,
}

/// Filters for the paginated event listing. Dates are inclusive calendar
/// bounds on `created_at`.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_name: Option<String>,
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventsPage {
    pub rows: Vec<Event>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// `ceil(total / page_size)` for 1-indexed listings; 0 when the result set
/// is empty or the page size is degenerate.
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 || total <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(name: Option<&str>) -> EventInput {
        EventInput {
            event: name.map(str::to_string),
            ..EventInput::default()
        }
    }

    #[test]
    fn from_input_rejects_missing_and_empty_names() {
        let now = Utc::now();
        for bad in [input(None), input(Some("")), input(Some("   "))] {
            let err = NewEvent::from_input(bad, None, None, "req".into(), now);
            assert!(matches!(err, Err(StoreError::Validation(_))));
        }
    }

    #[test]
    fn from_input_defaults_event_type_and_write_time() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap();
        let event = NewEvent::from_input(input(Some("page_view")), None, None, "req".into(), now)
            .expect("valid event");
        assert_eq!(event.event_type, "custom");
        assert_eq!(event.created_at, now);
    }

    #[test]
    fn from_input_honours_replay_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap();
        let replay = Utc.with_ymd_and_hms(2025, 12, 31, 8, 30, 0).single().unwrap();
        let mut payload = input(Some("login_success"));
        payload.timestamp = Some(replay);
        let event = NewEvent::from_input(payload, None, None, "req".into(), now)
            .expect("valid event");
        assert_eq!(event.created_at, replay);
    }

    #[test]
    fn properties_roundtrip_keeps_unknown_keys() {
        let raw = serde_json::json!({ "page_name": "/home", "plan": "pro" });
        let props: EventProperties = serde_json::from_value(raw).expect("parse properties");
        assert_eq!(props.page_name.as_deref(), Some("/home"));
        assert_eq!(props.get("plan"), Some(&serde_json::json!("pro")));
        assert_eq!(props.get("missing"), None);

        let back = serde_json::to_value(&props).expect("serialize properties");
        assert_eq!(back["plan"], "pro");
    }
}
