use anyhow::Result;

use pulselytics_core::event::{total_pages, Event, EventFilter, EventProperties, EventsPage};

use crate::queries::{date_floor, parse_timestamp};
use crate::DuckDbBackend;

const MAX_PAGE_SIZE: i64 = 200;

/// Paginated event listing, newest first. `page` is 1-indexed; out-of-range
/// values are clamped rather than rejected.
pub async fn query_events_inner(
    db: &DuckDbBackend,
    filter: &EventFilter,
    page: i64,
    page_size: i64,
) -> Result<EventsPage> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

    let conn = db.conn.lock().await;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    if let Some(ref event_name) = filter.event_name {
        filter_sql.push_str(&format!(" AND event_name = ?{param_idx}"));
        params.push(Box::new(event_name.clone()));
        param_idx += 1;
    }
    if let Some(ref event_type) = filter.event_type {
        filter_sql.push_str(&format!(" AND event_type = ?{param_idx}"));
        params.push(Box::new(event_type.clone()));
        param_idx += 1;
    }
    if let Some(ref user_id) = filter.user_id {
        filter_sql.push_str(&format!(" AND user_id = ?{param_idx}"));
        params.push(Box::new(user_id.clone()));
        param_idx += 1;
    }
    if let Some(start) = filter.start_date {
        filter_sql.push_str(&format!(" AND created_at >= ?{param_idx}"));
        params.push(Box::new(date_floor(start)));
        param_idx += 1;
    }
    if let Some(end) = filter.end_date {
        filter_sql.push_str(&format!(" AND created_at < ?{param_idx}"));
        params.push(Box::new(date_floor(end + chrono::Duration::days(1))));
        param_idx += 1;
    }

    let param_refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let total_sql = format!("SELECT COUNT(*) FROM events WHERE 1=1{filter_sql}");
    let total: i64 = conn
        .prepare(&total_sql)?
        .query_row(param_refs.as_slice(), |row| row.get(0))?;

    let rows_sql = format!(
        r#"
        SELECT id, event_name, event_type, properties, user_id, session_id,
               duration_ms, error_message, ip, user_agent, request_id,
               CAST(created_at AS VARCHAR)
        FROM events
        WHERE 1=1{filter_sql}
        ORDER BY created_at DESC, id DESC
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
        Ok(RawEventRow {
            id: row.get(0)?,
            event_name: row.get(1)?,
            event_type: row.get(2)?,
            properties: row.get(3)?,
            user_id: row.get(4)?,
            session_id: row.get(5)?,
            duration_ms: row.get(6)?,
            error_message: row.get(7)?,
            ip: row.get(8)?,
            user_agent: row.get(9)?,
            request_id: row.get(10)?,
            created_at: row.get(11)?,
        })
    })?;

    let mut rows = Vec::new();
    for raw in mapped {
        rows.push(raw?.into_event()?);
    }

    Ok(EventsPage {
        rows,
        total,
        page,
        page_size,
        total_pages: total_pages(total, page_size),
    })
}

struct RawEventRow {
    id: i64,
    event_name: String,
    event_type: String,
    properties: Option<String>,
    user_id: Option<String>,
    session_id: Option<String>,
    duration_ms: Option<i64>,
    error_message: Option<String>,
    ip: Option<String>,
    user_agent: Option<String>,
    request_id: String,
    created_at: String,
}

impl RawEventRow {
    fn into_event(self) -> Result<Event> {
        let properties: Option<EventProperties> = self
            .properties
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Event {
            id: self.id,
            event_name: self.event_name,
            event_type: self.event_type,
            properties,
            user_id: self.user_id,
            session_id: self.session_id,
            duration_ms: self.duration_ms,
            error_message: self.error_message,
            ip: self.ip,
            user_agent: self.user_agent,
            request_id: self.request_id,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
