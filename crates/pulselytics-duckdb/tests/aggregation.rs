mod support;

use chrono::NaiveDate;

use pulselytics_core::analytics::{
    AnalyticsBackend, DateRange, TrendInterval, TrendMetric, TrendPoint,
};
use pulselytics_core::error::StoreError;
use pulselytics_core::event::EventFilter;
use pulselytics_duckdb::DuckDbBackend;

use support::{event, page_view, with_duration};

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("literal date")
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange::new(date(start), date(end)).expect("valid range")
}

#[tokio::test]
async fn append_assigns_monotonic_ids() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let first = db
        .append(&event("login_success", Some("u1"), "2026-01-01 10:00:00"))
        .await
        .expect("append");
    let second = db
        .append(&event("page_view", Some("u1"), "2026-01-01 10:01:00"))
        .await
        .expect("append");
    assert!(second > first);
}

#[tokio::test]
async fn append_batch_is_all_or_nothing() {
    let db = DuckDbBackend::open_in_memory().expect("db");

    let batch = vec![
        event("page_view", Some("u1"), "2026-01-01 10:00:00"),
        event("button_click", Some("u1"), "2026-01-01 10:01:00"),
        event("login_success", Some("u2"), "2026-01-01 10:02:00"),
        event("", Some("u3"), "2026-01-01 10:03:00"),
    ];

    let err = db.append_batch(&batch).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    // Nothing stored: three valid events must not survive the rejected batch.
    let listing = db
        .query_events(&EventFilter::default(), 1, 50)
        .await
        .expect("list");
    assert_eq!(listing.total, 0);
    assert!(listing.rows.is_empty());
}

#[tokio::test]
async fn append_batch_rejects_empty_collection() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let err = db.append_batch(&[]).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn query_events_paginates_newest_first() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    for hour in 0..5 {
        db.append(&event(
            "page_view",
            Some("u1"),
            &format!("2026-01-01 1{hour}:00:00"),
        ))
        .await
        .expect("append");
    }

    let page1 = db
        .query_events(&EventFilter::default(), 1, 2)
        .await
        .expect("page 1");
    assert_eq!(page1.total, 5);
    assert_eq!(page1.total_pages, 3);
    assert_eq!(page1.rows.len(), 2);
    assert!(page1.rows[0].created_at > page1.rows[1].created_at);

    let page3 = db
        .query_events(&EventFilter::default(), 3, 2)
        .await
        .expect("page 3");
    assert_eq!(page3.rows.len(), 1);
}

#[tokio::test]
async fn query_events_filters_by_type_and_date() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let mut error_event = event("api_error", Some("u1"), "2026-01-02 09:00:00");
    error_event.event_type = "error".to_string();
    db.append(&error_event).await.expect("append");
    db.append(&event("page_view", Some("u1"), "2026-01-03 09:00:00"))
        .await
        .expect("append");

    let filter = EventFilter {
        event_type: Some("error".to_string()),
        start_date: Some(date("2026-01-01")),
        end_date: Some(date("2026-01-02")),
        ..EventFilter::default()
    };
    let listing = db.query_events(&filter, 1, 50).await.expect("list");
    assert_eq!(listing.total, 1);
    assert_eq!(listing.rows[0].event_name, "api_error");
}

#[tokio::test]
async fn stats_ranks_event_names_by_count() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    for _ in 0..3 {
        db.append(&event("page_view", Some("u1"), "2026-01-01 10:00:00"))
            .await
            .expect("append");
    }
    db.append(&event("button_click", Some("u1"), "2026-01-01 10:00:00"))
        .await
        .expect("append");

    let stats = db
        .stats(None, Some(date("2026-01-01")), Some(date("2026-01-01")))
        .await
        .expect("stats");
    assert_eq!(stats.total, 4);
    assert_eq!(stats.by_event_name.len(), 2);
    assert_eq!(stats.by_event_name[0].event_name, "page_view");
    assert_eq!(stats.by_event_name[0].count, 3);
    assert_eq!(stats.by_event_name[1].event_name, "button_click");
}

#[tokio::test]
async fn stats_event_type_filter_narrows_totals() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let mut error_event = event("api_error", None, "2026-01-01 10:00:00");
    error_event.event_type = "error".to_string();
    db.append(&error_event).await.expect("append");
    db.append(&event("page_view", Some("u1"), "2026-01-01 11:00:00"))
        .await
        .expect("append");

    let stats = db
        .stats(Some("error"), None, None)
        .await
        .expect("stats");
    assert_eq!(stats.total, 1);
    assert_eq!(stats.by_event_name[0].event_name, "api_error");
}

#[tokio::test]
async fn dau_counts_distinct_users_and_excludes_anonymous() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    db.append(&event("page_view", Some("u1"), "2026-02-01 08:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", Some("u1"), "2026-02-01 09:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", Some("u2"), "2026-02-01 10:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", None, "2026-02-01 11:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", Some("u3"), "2026-02-02 10:00:00"))
        .await
        .expect("append");

    let stats = db
        .activity_stats(range("2026-02-01", "2026-02-02"))
        .await
        .expect("activity");

    // Ground truth: distinct non-null user_ids per day.
    assert_eq!(stats.dau.len(), 2);
    assert_eq!(stats.dau[0].date, "2026-02-01");
    assert_eq!(stats.dau[0].dau, 2);
    assert_eq!(stats.dau[1].dau, 1);

    assert_eq!(stats.mau.len(), 1);
    assert_eq!(stats.mau[0].mau, 3);
}

#[tokio::test]
async fn conversion_rates_are_relative_to_page_view_cohort() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    // Cohort of two page_view users; one converts to login_success.
    db.append(&event("page_view", Some("u1"), "2026-02-01 08:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", Some("u2"), "2026-02-01 08:05:00"))
        .await
        .expect("append");
    db.append(&event("login_success", Some("u1"), "2026-02-01 08:10:00"))
        .await
        .expect("append");
    // A converter outside the cohort must not count.
    db.append(&event("login_success", Some("u9"), "2026-02-01 09:00:00"))
        .await
        .expect("append");

    let stats = db
        .activity_stats(range("2026-02-01", "2026-02-01"))
        .await
        .expect("activity");
    assert_eq!(stats.conversion_rate.len(), 1);
    let row = &stats.conversion_rate[0];
    assert_eq!(row.event_name, "login_success");
    assert_eq!(row.user_count, 1);
    assert_eq!(row.total_users, 2);
    assert_eq!(row.conversion_rate, 50.0);
}

#[tokio::test]
async fn page_view_stats_counts_pv_and_uv() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    // The canonical scenario: two /home views and a login by one user.
    db.append(&page_view("u1", "/home", "2026-02-01 08:00:00"))
        .await
        .expect("append");
    db.append(&page_view("u1", "/home", "2026-02-01 09:00:00"))
        .await
        .expect("append");
    db.append(&event("login_success", Some("u1"), "2026-02-01 10:00:00"))
        .await
        .expect("append");

    let stats = db
        .page_view_stats(range("2026-02-01", "2026-02-01"))
        .await
        .expect("page views");
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].page_url, "/home");
    assert_eq!(stats[0].pv, 2);
    assert_eq!(stats[0].uv, 1);
}

#[tokio::test]
async fn page_view_stats_ignores_events_without_page_name() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    db.append(&event("page_view", Some("u1"), "2026-02-01 08:00:00"))
        .await
        .expect("append");
    let stats = db
        .page_view_stats(range("2026-02-01", "2026-02-01"))
        .await
        .expect("page views");
    assert!(stats.is_empty());
}

#[tokio::test]
async fn event_stats_respects_limit_and_order() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    for _ in 0..3 {
        db.append(&event("page_view", Some("u1"), "2026-02-01 08:00:00"))
            .await
            .expect("append");
    }
    for _ in 0..2 {
        db.append(&event("button_click", Some("u2"), "2026-02-01 08:00:00"))
            .await
            .expect("append");
    }
    db.append(&event("login_success", Some("u1"), "2026-02-01 08:00:00"))
        .await
        .expect("append");

    let stats = db
        .event_stats(range("2026-02-01", "2026-02-01"), 2)
        .await
        .expect("event stats");
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].event_name, "page_view");
    assert_eq!(stats[0].count, 3);
    assert_eq!(stats[0].unique_users, 1);
    assert_eq!(stats[1].event_name, "button_click");
}

#[tokio::test]
async fn events_trend_buckets_by_day_without_zero_fill() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    db.append(&event("page_view", Some("u1"), "2026-02-01 08:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", Some("u2"), "2026-02-01 09:00:00"))
        .await
        .expect("append");
    // 2026-02-02 has no events and must not appear.
    db.append(&event("page_view", Some("u1"), "2026-02-03 09:00:00"))
        .await
        .expect("append");

    let trend = db
        .trend_analysis(
            TrendMetric::Events,
            range("2026-02-01", "2026-02-03"),
            TrendInterval::Day,
        )
        .await
        .expect("trend");
    assert_eq!(trend.len(), 2);
    match &trend[0] {
        TrendPoint::Events {
            time_bucket,
            count,
            unique_users,
        } => {
            assert!(time_bucket.starts_with("2026-02-01"));
            assert_eq!(*count, 2);
            assert_eq!(*unique_users, 2);
        }
        other => panic!("unexpected point shape: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_metric_falls_back_to_events_shape() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    db.append(&event("page_view", Some("u1"), "2026-02-01 08:00:00"))
        .await
        .expect("append");

    let trend = db
        .trend_analysis(
            TrendMetric::parse(Some("nonsense")),
            range("2026-02-01", "2026-02-01"),
            TrendInterval::parse(Some("fortnight")),
        )
        .await
        .expect("trend");
    assert!(matches!(trend[0], TrendPoint::Events { .. }));
}

#[tokio::test]
async fn performance_trend_reports_duration_percentiles() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    db.append(&with_duration("api_call", "u1", 100, "2026-02-01 08:00:00"))
        .await
        .expect("append");
    db.append(&with_duration("api_call", "u1", 200, "2026-02-01 09:00:00"))
        .await
        .expect("append");
    db.append(&with_duration("api_call", "u1", 300, "2026-02-01 10:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", Some("u1"), "2026-02-01 11:00:00"))
        .await
        .expect("append");

    let trend = db
        .trend_analysis(
            TrendMetric::Performance,
            range("2026-02-01", "2026-02-01"),
            TrendInterval::Day,
        )
        .await
        .expect("trend");
    assert_eq!(trend.len(), 1);
    match &trend[0] {
        TrendPoint::Performance {
            total_events,
            events_with_duration,
            avg_duration,
            median_duration,
            ..
        } => {
            assert_eq!(*total_events, 4);
            assert_eq!(*events_with_duration, 3);
            assert_eq!(*avg_duration, 200.0);
            assert_eq!(*median_duration, 200.0);
        }
        other => panic!("unexpected point shape: {other:?}"),
    }
}

#[tokio::test]
async fn retention_trend_excludes_anonymous_prefixed_users() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    db.append(&event("page_view", Some("u1"), "2026-02-01 08:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", Some("u1"), "2026-02-02 08:00:00"))
        .await
        .expect("append");
    db.append(&event("page_view", Some("anonymous_42"), "2026-02-01 08:00:00"))
        .await
        .expect("append");

    let trend = db
        .trend_analysis(
            TrendMetric::Retention,
            range("2026-02-01", "2026-02-02"),
            TrendInterval::Day,
        )
        .await
        .expect("trend");
    assert_eq!(trend.len(), 1);
    match &trend[0] {
        TrendPoint::Retention {
            new_users,
            day1_retained,
            day1_retention_rate,
            ..
        } => {
            assert_eq!(*new_users, 1);
            assert_eq!(*day1_retained, 1);
            assert_eq!(*day1_retention_rate, 100.0);
        }
        other => panic!("unexpected point shape: {other:?}"),
    }
}
