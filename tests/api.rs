//! JSON API surface: uploads, creation, call triggers, dashboard.

mod common;

use autodialer_rs::db_types::PhoneStatus;
use autodialer_rs::handlers;
use autodialer_rs::repo::PhoneRepo;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn text_upload_creates_pending_records_and_skips_junk() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state.clone());

    let (status, body) = post_json(
        &app,
        "/phone_numbers/upload",
        json!({ "text": "+1 (800) 123-4567\n18002345678, 18003456789\nshort" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let stats = PhoneRepo::stats(&state.db_pool).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 3);

    let record = PhoneRepo::find_by_number(&state.db_pool, "18001234567")
        .await
        .unwrap()
        .expect("number is stored digits-only");
    assert_eq!(record.status, PhoneStatus::Pending);
    assert_eq!(record.name, "Imported Number");
}

#[tokio::test]
async fn duplicate_uploads_are_skipped() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state.clone());

    let (_, body) = post_json(
        &app,
        "/phone_numbers/upload",
        json!({ "text": "18001234567" }),
    )
    .await;
    assert_eq!(body["count"], 1);

    // Same number in different formatting normalizes to a duplicate.
    let (_, body) = post_json(
        &app,
        "/phone_numbers/upload",
        json!({ "text": "1-800-123-4567" }),
    )
    .await;
    assert_eq!(body["count"], 0);

    let stats = PhoneRepo::stats(&state.db_pool).await.unwrap();
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn csv_upload_honors_header_aliases() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state.clone());

    let (status, body) = post_json(
        &app,
        "/phone_numbers/upload",
        json!({ "csv": "phone,name\n18001234567,Office\n18002345678,\n" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let office = PhoneRepo::find_by_number(&state.db_pool, "18001234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(office.name, "Office");
    let unnamed = PhoneRepo::find_by_number(&state.db_pool, "18002345678")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unnamed.name, "Imported Number");
}

#[tokio::test]
async fn upload_without_input_is_rejected() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state);

    let (status, body) = post_json(&app, "/phone_numbers/upload", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn create_validates_and_rejects_duplicates() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state);

    let (status, body) = post_json(&app, "/phone_numbers", json!({ "number": "123" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));

    let (status, body) = post_json(
        &app,
        "/phone_numbers",
        json!({ "number": "18001234567", "name": "Front Desk" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["phone_number"]["status"], "pending");

    let (status, body) =
        post_json(&app, "/phone_numbers", json!({ "number": "1 (800) 123-4567" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0], "Number has already been taken");
}

#[tokio::test]
async fn call_single_in_mock_mode_marks_the_record_called() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state.clone());
    let record = PhoneRepo::insert(&state.db_pool, "18001234567", "Test")
        .await
        .unwrap();

    let (status, body) = post_json(
        &app,
        "/phone_numbers/call_single",
        json!({ "phone_number_id": record.id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let record = PhoneRepo::find_by_id(&state.db_pool, record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PhoneStatus::Called);
}

#[tokio::test]
async fn call_all_reports_batch_counts() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state.clone());
    for number in ["18001234567", "18002345678"] {
        PhoneRepo::insert(&state.db_pool, number, "Test")
            .await
            .unwrap();
    }

    let (status, body) = post_json(&app, "/phone_numbers/call_all", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attempted"], 2);
    assert_eq!(body["successful"], 2);
}

#[tokio::test]
async fn dashboard_aggregates_counts() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state.clone());
    for number in ["18001234567", "18002345678"] {
        PhoneRepo::insert(&state.db_pool, number, "Test")
            .await
            .unwrap();
    }
    post_json(&app, "/phone_numbers/call_all", json!({})).await;

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_numbers"], 2);
    assert_eq!(body["pending_calls"], 0);
    assert_eq!(body["completed_calls"], 2);
    assert_eq!(body["recent_calls"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn blog_creation_validates_and_publishes() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state);

    let (status, body) = post_json(
        &app,
        "/blog_posts",
        json!({ "title": "", "content": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);

    let (status, body) = post_json(
        &app,
        "/blog_posts",
        json!({ "title": "Dialing at scale", "content": "Lessons learned." }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["blog_post"]["author"], "Autodialer Admin");

    let (status, body) = get(&app, "/blog_posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blog_posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn health_check_responds() {
    let (state, _guard) = common::test_state().await;
    let app = handlers::router(state);

    let request = Request::builder().uri("/up").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
