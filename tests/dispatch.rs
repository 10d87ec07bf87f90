//! Batch-dial behavior in mock mode: no network, synthesized completions.

mod common;

use autodialer_rs::consts;
use autodialer_rs::db_types::PhoneStatus;
use autodialer_rs::dispatcher;
use autodialer_rs::repo::{CallLogRepo, PhoneRepo};
use autodialer_rs::twilio_types::CallStatus;

#[tokio::test]
async fn mock_dispatch_completes_every_pending_record() {
    let (state, _guard) = common::test_state().await;
    let pool = &state.db_pool;
    for number in ["18001234567", "18002345678", "18003456789"] {
        PhoneRepo::insert(pool, number, "Test").await.unwrap();
    }

    let report = dispatcher::dispatch_pending(&state, consts::CALL_BATCH_LIMIT)
        .await
        .unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.successful, 3);

    let stats = PhoneRepo::stats(pool).await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.called, 3);

    let record = PhoneRepo::find_by_number(pool, "18001234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PhoneStatus::Called);

    let logs = CallLogRepo::for_phone_number(pool, record.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    let log = &logs[0];
    assert_eq!(log.status, CallStatus::Completed);
    assert!(log.call_sid.starts_with("CAdev"), "sid: {}", log.call_sid);
    assert!(log.started_at.is_some());
    let duration = log.duration.expect("synthesized calls carry a duration");
    assert!((10..=60).contains(&duration), "duration: {duration}");
}

#[tokio::test]
async fn dispatch_honors_the_batch_limit() {
    let (state, _guard) = common::test_state().await;
    let pool = &state.db_pool;
    for number in ["18001234567", "18002345678", "18003456789"] {
        PhoneRepo::insert(pool, number, "Test").await.unwrap();
    }

    let report = dispatcher::dispatch_pending(&state, 2).await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.successful, 2);

    let stats = PhoneRepo::stats(pool).await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.called, 2);
}

#[tokio::test]
async fn dispatch_with_nothing_pending_reports_zero() {
    let (state, _guard) = common::test_state().await;

    let report = dispatcher::dispatch_pending(&state, consts::CALL_BATCH_LIMIT)
        .await
        .unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(report.successful, 0);
}

#[tokio::test]
async fn already_called_records_are_not_redialed() {
    let (state, _guard) = common::test_state().await;
    let pool = &state.db_pool;
    let record = PhoneRepo::insert(pool, "18001234567", "Test").await.unwrap();
    PhoneRepo::update_status(pool, record.id, PhoneStatus::Called)
        .await
        .unwrap();

    let report = dispatcher::dispatch_pending(&state, consts::CALL_BATCH_LIMIT)
        .await
        .unwrap();
    assert_eq!(report.attempted, 0);

    let logs = CallLogRepo::for_phone_number(pool, record.id).await.unwrap();
    assert!(logs.is_empty());
}
