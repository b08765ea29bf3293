mod common;

use chrono::Duration;

use common::{check_in, test_queue, test_queue_with_offset};
use queue_cell::models::{CallNextRequest, Priority};

#[tokio::test]
async fn metrics_on_empty_queue_are_all_zero() {
    let q = test_queue();

    let metrics = q.lifecycle.metrics(None).await.expect("metrics should succeed");
    assert_eq!(metrics.total_waiting, 0);
    assert_eq!(metrics.called_today, 0);
    assert_eq!(metrics.completed_today, 0);
    assert_eq!(metrics.no_show_today, 0);
    assert_eq!(metrics.average_wait_time_minutes, 0.0);
    assert_eq!(metrics.no_show_rate, 0.0);
    assert_eq!(metrics.completion_rate, 0.0);
    assert_eq!(metrics.throughput_per_hour, 0.0);
}

#[tokio::test]
async fn metrics_aggregate_a_clinic_morning() {
    let q = test_queue();

    // First patient: waits 10 minutes, completes.
    let (first, _) = q
        .lifecycle
        .enqueue(check_in(Priority::Normal, "general"))
        .await
        .expect("check-in should succeed");
    q.clock.advance(Duration::minutes(10));
    q.lifecycle
        .call_next(None, CallNextRequest::default())
        .await
        .expect("call-next should succeed");
    q.lifecycle.begin(first.id).await.expect("begin should succeed");
    q.lifecycle
        .complete(first.id)
        .await
        .expect("complete should succeed");

    // Second patient: waits 20 minutes, never shows up after the call.
    let (second, _) = q
        .lifecycle
        .enqueue(check_in(Priority::Normal, "general"))
        .await
        .expect("check-in should succeed");
    q.clock.advance(Duration::minutes(20));
    q.lifecycle
        .call_next(None, CallNextRequest::default())
        .await
        .expect("call-next should succeed");
    q.lifecycle
        .mark_no_show(second.id)
        .await
        .expect("no-show should succeed");

    // Third patient is still waiting.
    q.lifecycle
        .enqueue(check_in(Priority::Low, "general"))
        .await
        .expect("check-in should succeed");

    let metrics = q.lifecycle.metrics(None).await.expect("metrics should succeed");
    assert_eq!(metrics.total_waiting, 1);
    assert_eq!(metrics.called_today, 2);
    assert_eq!(metrics.completed_today, 1);
    assert_eq!(metrics.no_show_today, 1);
    assert_eq!(metrics.average_wait_time_minutes, 15.0);
    assert_eq!(metrics.no_show_rate, 0.5);
    assert_eq!(metrics.completion_rate, 0.5);
    // One completion, 9.5 hours into the clinic day.
    assert!((metrics.throughput_per_hour - 1.0 / 9.5).abs() < 1e-9);
}

#[tokio::test]
async fn metrics_scope_to_department() {
    let q = test_queue();

    q.lifecycle
        .enqueue(check_in(Priority::Normal, "cardiology"))
        .await
        .expect("check-in should succeed");
    q.lifecycle
        .enqueue(check_in(Priority::Normal, "radiology"))
        .await
        .expect("check-in should succeed");

    let cardio = q
        .lifecycle
        .metrics(Some("cardiology"))
        .await
        .expect("metrics should succeed");
    assert_eq!(cardio.department.as_deref(), Some("cardiology"));
    assert_eq!(cardio.total_waiting, 1);

    let all = q.lifecycle.metrics(None).await.expect("metrics should succeed");
    assert_eq!(all.department, None);
    assert_eq!(all.total_waiting, 2);
}

#[tokio::test]
async fn metrics_are_idempotent_without_mutation() {
    let q = test_queue();

    let (entry, _) = q
        .lifecycle
        .enqueue(check_in(Priority::Normal, "general"))
        .await
        .expect("check-in should succeed");
    q.clock.advance(Duration::minutes(5));
    q.lifecycle
        .call_next(None, CallNextRequest::default())
        .await
        .expect("call-next should succeed");
    q.lifecycle.begin(entry.id).await.expect("begin should succeed");
    q.lifecycle
        .complete(entry.id)
        .await
        .expect("complete should succeed");

    let first = q.lifecycle.metrics(None).await.expect("metrics should succeed");
    let second = q.lifecycle.metrics(None).await.expect("metrics should succeed");
    assert_eq!(first, second);
}

#[tokio::test]
async fn today_follows_the_clinic_local_day() {
    // Clinic five hours behind UTC: at 03:00 UTC the clinic is still on
    // the previous local day.
    let q = test_queue_with_offset(-300);

    let (entry, _) = q
        .lifecycle
        .enqueue(check_in(Priority::Normal, "general"))
        .await
        .expect("check-in should succeed");
    q.lifecycle
        .call_next(None, CallNextRequest::default())
        .await
        .expect("call-next should succeed");
    q.lifecycle.begin(entry.id).await.expect("begin should succeed");
    q.lifecycle
        .complete(entry.id)
        .await
        .expect("complete should succeed");

    let metrics = q.lifecycle.metrics(None).await.expect("metrics should succeed");
    assert_eq!(metrics.completed_today, 1);

    // Cross UTC midnight but stay within the same clinic-local day.
    q.clock.advance(Duration::hours(16));
    let metrics = q.lifecycle.metrics(None).await.expect("metrics should succeed");
    assert_eq!(metrics.completed_today, 1);

    // Cross the clinic-local midnight too; yesterday's visit drops out.
    q.clock.advance(Duration::hours(5));
    let metrics = q.lifecycle.metrics(None).await.expect("metrics should succeed");
    assert_eq!(metrics.completed_today, 0);
    assert_eq!(metrics.called_today, 0);
}
