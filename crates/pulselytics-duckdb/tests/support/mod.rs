#![allow(dead_code)]

use chrono::{DateTime, NaiveDateTime, Utc};

use pulselytics_core::event::{EventProperties, NewEvent};

pub fn ts(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .expect("literal timestamp")
        .and_utc()
}

pub fn event(name: &str, user_id: Option<&str>, created_at: &str) -> NewEvent {
    NewEvent {
        event_name: name.to_string(),
        event_type: "custom".to_string(),
        properties: None,
        user_id: user_id.map(str::to_string),
        session_id: None,
        duration_ms: None,
        error_message: None,
        ip: Some("10.0.0.1".to_string()),
        user_agent: Some("Mozilla/5.0 Chrome/120".to_string()),
        request_id: uuid::Uuid::new_v4().to_string(),
        created_at: ts(created_at),
    }
}

pub fn page_view(user_id: &str, page: &str, created_at: &str) -> NewEvent {
    let mut e = event("page_view", Some(user_id), created_at);
    e.properties = Some(EventProperties {
        page_name: Some(page.to_string()),
        extra: serde_json::Map::new(),
    });
    e
}

pub fn with_duration(name: &str, user_id: &str, duration_ms: i64, created_at: &str) -> NewEvent {
    let mut e = event(name, Some(user_id), created_at);
    e.duration_ms = Some(duration_ms);
    e
}
