use crate::consts::{CALL_BATCH_LIMIT, CHAT_CALL_BATCH_LIMIT, MIN_NUMBER_DIGITS, RECENT_LIMIT};
use crate::db_types::PhoneStatus;
use crate::dispatcher;
use crate::error::AppError;
use crate::openai;
use crate::repo::{self, BlogRepo, CallLogRepo, PhoneRepo};
use crate::twilio::{self, CallOutcome};
use crate::twilio_types::{wrap_twiml, CallStatus, Response as Twiml, StatusCallbackPayload};
use crate::types::{
    AppState, CallSingleRequest, ChatAction, ChatRequest, CreateBlogPostRequest,
    CreateNumberRequest, GenerateBlogPostsRequest, UploadRequest,
};
use crate::utils;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sqlx::types::time::OffsetDateTime;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

type ApiError = (StatusCode, Json<Value>);

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/up", get(health))
        .route("/phone_numbers", get(list_numbers).post(create_number))
        .route("/phone_numbers/upload", post(upload_numbers))
        .route("/phone_numbers/call_single", post(call_single))
        .route("/phone_numbers/call_all", post(call_all))
        .route("/phone_numbers/:id", get(show_number))
        .route("/ai_chat/process", post(process_chat))
        .route("/blog_posts", get(list_blog_posts).post(create_blog_post))
        .route("/blog_posts/generate_ai_posts", post(generate_ai_posts))
        .route("/blog_posts/:id", get(show_blog_post))
        .route(
            "/twilio/status_callback/:phone_number_id",
            post(status_callback),
        )
        .with_state(app_state)
}

fn generic_failure() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": "Sorry, I encountered an error. Please try again.",
        })),
    )
}

fn db_error(e: sqlx::Error) -> ApiError {
    error!(error=%e, "db error");
    generic_failure()
}

fn internal_error(e: AppError) -> ApiError {
    error!(error=%e, "internal error");
    generic_failure()
}

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "message": message })),
    )
}

fn not_found(message: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": message })),
    )
}

async fn health() -> &'static str {
    "OK"
}

async fn dashboard(State(app_state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let pool = &app_state.db_pool;
    let phones = PhoneRepo::stats(pool).await.map_err(db_error)?;
    let calls = CallLogRepo::stats(pool).await.map_err(db_error)?;
    let recent = CallLogRepo::recent(pool, RECENT_LIMIT).await.map_err(db_error)?;
    Ok(Json(json!({
        "total_numbers": phones.total,
        "pending_calls": phones.pending,
        "completed_calls": calls.successful,
        "failed_calls": calls.failed,
        "recent_calls": recent,
    })))
}

async fn list_numbers(State(app_state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let pool = &app_state.db_pool;
    let records = PhoneRepo::list_by_status(pool).await.map_err(db_error)?;
    let stats = PhoneRepo::stats(pool).await.map_err(db_error)?;
    Ok(Json(json!({ "phone_numbers": records, "stats": stats })))
}

async fn show_number(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let pool = &app_state.db_pool;
    let record = PhoneRepo::find_by_id(pool, id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Phone number not found"))?;
    let call_logs = CallLogRepo::for_phone_number(pool, id).await.map_err(db_error)?;
    Ok(Json(json!({ "phone_number": record, "call_logs": call_logs })))
}

/// Create one record.  Validation failures are collected into a message
/// list and touch nothing.
async fn create_number(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<CreateNumberRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let pool = &app_state.db_pool;
    let number = utils::normalize_number(&req.number);

    let mut errors = Vec::new();
    if number.is_empty() {
        errors.push("Number can't be blank".to_string());
    } else if number.len() < MIN_NUMBER_DIGITS {
        errors.push(format!("Number must have at least {MIN_NUMBER_DIGITS} digits"));
    } else if PhoneRepo::find_by_number(pool, &number)
        .await
        .map_err(db_error)?
        .is_some()
    {
        errors.push("Number has already been taken".to_string());
    }
    if !errors.is_empty() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "success": false, "errors": errors })),
        ));
    }

    let record = PhoneRepo::insert(pool, &number, req.name.as_deref().unwrap_or(""))
        .await
        .map_err(db_error)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Phone number added successfully!",
            "phone_number": record,
        })),
    ))
}

/// Bulk upload: a pasted text blob or a header-addressed CSV.  Entries that
/// fail normalization or uniqueness are skipped, not fatal.
async fn upload_numbers(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<Value>, ApiError> {
    let pool = &app_state.db_pool;

    let mut entries: Vec<(String, String)> = Vec::new();
    if let Some(text) = req.text.as_deref().filter(|t| !t.trim().is_empty()) {
        let default_name = req
            .default_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Imported Number");
        for raw in utils::split_number_list(text) {
            entries.push((raw.to_string(), default_name.to_string()));
        }
    } else if let Some(csv) = req.csv.as_deref().filter(|c| !c.trim().is_empty()) {
        let rows = utils::parse_number_csv(csv)
            .map_err(|e| bad_request(&format!("Error processing CSV: {e}")))?;
        for row in rows {
            let name = row.name.unwrap_or_else(|| "Imported Number".to_string());
            entries.push((row.number, name));
        }
    } else {
        return Err(bad_request(
            "Please provide phone numbers or upload a CSV file.",
        ));
    }

    let mut count = 0;
    for (raw, name) in entries {
        let number = utils::normalize_number(&raw);
        if number.len() < MIN_NUMBER_DIGITS {
            continue;
        }
        match PhoneRepo::insert(pool, &number, &name).await {
            Ok(_) => count += 1,
            Err(e) if repo::is_unique_violation(&e) => continue,
            Err(e) => return Err(db_error(e)),
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully uploaded {count} phone numbers!"),
        "count": count,
    })))
}

async fn call_single(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<CallSingleRequest>,
) -> Result<Json<Value>, ApiError> {
    let pool = &app_state.db_pool;
    let record = PhoneRepo::find_by_id(pool, req.phone_number_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Phone number not found"))?;

    match twilio::submit_call(&app_state, &record.number, record.id)
        .await
        .map_err(internal_error)?
    {
        CallOutcome::Submitted { .. } => {
            PhoneRepo::update_status(pool, record.id, PhoneStatus::Called)
                .await
                .map_err(db_error)?;
            Ok(Json(json!({
                "success": true,
                "message": format!("Call initiated to {}!", record.number),
            })))
        }
        CallOutcome::Rejected { error } => Ok(Json(json!({
            "success": false,
            "message": format!("Failed to make call: {error}"),
        }))),
    }
}

async fn call_all(State(app_state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let report = dispatcher::dispatch_pending(&app_state, CALL_BATCH_LIMIT)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Initiated {} calls!", report.successful),
        "attempted": report.attempted,
        "successful": report.successful,
    })))
}

async fn process_chat(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Ok(Json(json!({
            "success": false,
            "message": "Please enter a message",
        })));
    }

    let command = match openai::process_chat_command(&app_state, message).await {
        Ok(command) => command,
        Err(e) => {
            error!(error=%e, "chat command interpretation failed");
            return Ok(Json(json!({
                "success": false,
                "message": "Sorry, I encountered an error. Please try again.",
            })));
        }
    };

    match command.action {
        ChatAction::CallSingle => {
            handle_single_call(&app_state, command.parameter("phone_number")).await
        }
        ChatAction::CallAll => handle_call_all(&app_state).await,
        ChatAction::ShowNumbers => handle_show_numbers(&app_state).await,
        ChatAction::ShowStats => handle_show_stats(&app_state).await,
        ChatAction::UploadGuide => Ok(Json(json!({
            "success": true,
            "message": command.message,
            "action": "redirect",
            "url": "/phone_numbers/upload",
        }))),
        ChatAction::Help | ChatAction::Unknown => Ok(Json(json!({
            "success": true,
            "message": command.message,
        }))),
    }
}

async fn handle_single_call(
    app_state: &AppState,
    number_param: Option<&str>,
) -> Result<Json<Value>, ApiError> {
    let pool = &app_state.db_pool;
    let number = match number_param {
        Some(raw) => utils::normalize_number(raw),
        None => String::new(),
    };
    if number.len() < MIN_NUMBER_DIGITS {
        return Ok(Json(json!({
            "success": false,
            "message": "Please specify a valid phone number",
        })));
    }

    let record = match PhoneRepo::find_by_number(pool, &number).await.map_err(db_error)? {
        Some(record) => record,
        None => PhoneRepo::insert(pool, &number, "AI Added Number")
            .await
            .map_err(db_error)?,
    };

    match twilio::submit_call(app_state, &record.number, record.id)
        .await
        .map_err(internal_error)?
    {
        CallOutcome::Submitted { call_sid } => {
            PhoneRepo::update_status(pool, record.id, PhoneStatus::Called)
                .await
                .map_err(db_error)?;
            Ok(Json(json!({
                "success": true,
                "message": format!("Call initiated to {number}! Call SID: {call_sid}"),
            })))
        }
        CallOutcome::Rejected { error } => Ok(Json(json!({
            "success": false,
            "message": format!("Failed to make call: {error}"),
        }))),
    }
}

async fn handle_call_all(app_state: &AppState) -> Result<Json<Value>, ApiError> {
    let stats = PhoneRepo::stats(&app_state.db_pool).await.map_err(db_error)?;
    if stats.pending == 0 {
        return Ok(Json(json!({
            "success": true,
            "message": "No pending numbers to call. Please upload some phone numbers first.",
        })));
    }

    let report = dispatcher::dispatch_pending(app_state, CHAT_CALL_BATCH_LIMIT)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Initiated {} calls out of {} pending numbers!",
            report.successful, report.attempted
        ),
    })))
}

async fn handle_show_numbers(app_state: &AppState) -> Result<Json<Value>, ApiError> {
    let records = PhoneRepo::list(&app_state.db_pool, RECENT_LIMIT)
        .await
        .map_err(db_error)?;
    let lines = records
        .iter()
        .map(|r| format!("{} ({})", r.number, r.status.as_str()))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Here are your phone numbers:\n\n{lines}\n\nShowing first {RECENT_LIMIT} numbers."
        ),
    })))
}

async fn handle_show_stats(app_state: &AppState) -> Result<Json<Value>, ApiError> {
    let pool = &app_state.db_pool;
    let phones = PhoneRepo::stats(pool).await.map_err(db_error)?;
    let calls = CallLogRepo::stats(pool).await.map_err(db_error)?;
    let success_rate = if phones.total > 0 {
        calls.successful as f64 / phones.total as f64 * 100.0
    } else {
        0.0
    };
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Call Statistics:\n\n\
             Total Numbers: {}\n\
             Pending Calls: {}\n\
             Numbers Called: {}\n\
             Successful Calls: {}\n\
             Failed Calls: {}\n\n\
             Success Rate: {:.1}%",
            phones.total, phones.pending, phones.called, calls.successful, calls.failed,
            success_rate,
        ),
    })))
}

async fn list_blog_posts(State(app_state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let posts = BlogRepo::list_published(&app_state.db_pool)
        .await
        .map_err(db_error)?;
    Ok(Json(json!({ "blog_posts": posts })))
}

async fn show_blog_post(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let post = BlogRepo::find_by_id(&app_state.db_pool, id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Blog post not found"))?;
    Ok(Json(json!({ "blog_post": post })))
}

async fn create_blog_post(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<CreateBlogPostRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut errors = Vec::new();
    if req.title.trim().is_empty() {
        errors.push("Title can't be blank".to_string());
    }
    if req.content.trim().is_empty() {
        errors.push("Content can't be blank".to_string());
    }
    if !errors.is_empty() {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "success": false, "errors": errors })),
        ));
    }

    let post = BlogRepo::insert(
        &app_state.db_pool,
        req.title.trim(),
        &req.content,
        "Autodialer Admin",
        Some(OffsetDateTime::now_utc()),
    )
    .await
    .map_err(db_error)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Blog post created successfully!",
            "blog_post": post,
        })),
    ))
}

/// Generate one published post per "Title - Description" line, pausing
/// between completions the same way the dispatcher paces calls.
async fn generate_ai_posts(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<GenerateBlogPostsRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.titles_list.trim().is_empty() {
        return Err(bad_request("Please provide titles for blog posts"));
    }

    let mut generated = 0;
    for line in req.titles_list.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (title, description) = match line.split_once(" - ") {
            Some((title, description)) => (title.trim(), description.trim()),
            None => (line, ""),
        };
        if title.is_empty() {
            continue;
        }

        let content = match openai::generate_blog_post(&app_state, title, description).await {
            Ok(content) if !content.is_empty() => content,
            Ok(_) => continue,
            Err(e) => {
                error!(error=%e, title, "blog generation failed");
                return Err(internal_error(e));
            }
        };
        BlogRepo::insert(
            &app_state.db_pool,
            title,
            &content,
            "AI Assistant",
            Some(OffsetDateTime::now_utc()),
        )
        .await
        .map_err(db_error)?;
        generated += 1;
        sleep(app_state.config.dispatch_delay).await;
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully generated {generated} blog posts!"),
    })))
}

/// Twilio delivery-status callback.  Reconciliation problems are warned
/// about and acknowledged; the provider only sees a 500 when the store
/// itself fails.
async fn status_callback(
    State(app_state): State<Arc<AppState>>,
    Path(phone_number_id): Path<i64>,
    body: String,
) -> impl IntoResponse {
    let ack = wrap_twiml(xmlserde::xml_serialize(Twiml::empty()));
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "application/xml".parse().unwrap());

    match reconcile_status(&app_state, phone_number_id, &body).await {
        Ok(()) => (StatusCode::OK, headers, ack),
        Err(e) => {
            error!(error=%e, phone_number_id, "webhook reconciliation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, headers, ack)
        }
    }
}

async fn reconcile_status(
    app_state: &AppState,
    phone_number_id: i64,
    body: &str,
) -> Result<(), AppError> {
    let payload = match serde_urlencoded::from_str::<StatusCallbackPayload>(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error=%e, phone_number_id, "unreadable status callback body");
            return Ok(());
        }
    };
    let (call_sid, raw_status) = match (payload.call_sid, payload.call_status) {
        (Some(sid), Some(status)) => (sid, status),
        _ => {
            warn!(phone_number_id, "status callback missing CallSid or CallStatus");
            return Ok(());
        }
    };
    info!(%call_sid, status=%raw_status, phone_number_id, "twilio status callback");

    let pool = &app_state.db_pool;
    let record = match PhoneRepo::find_by_id(pool, phone_number_id).await.map_err(|e| {
        error!(error=%e, "failed to load phone record");
        AppError("db error")
    })? {
        Some(record) => record,
        None => {
            warn!(phone_number_id, "phone record not found for status callback");
            return Ok(());
        }
    };
    let call_log = match CallLogRepo::find_by_sid(pool, record.id, &call_sid)
        .await
        .map_err(|e| {
            error!(error=%e, "failed to load call log");
            AppError("db error")
        })? {
        Some(log) => log,
        None => {
            warn!(%call_sid, "call log not found for SID");
            return Ok(());
        }
    };
    let status = match CallStatus::parse(&raw_status) {
        Some(status) => status,
        None => {
            warn!(status=%raw_status, "unknown call status in callback");
            return Ok(());
        }
    };

    let duration = payload
        .call_duration
        .as_deref()
        .and_then(|d| d.parse::<i64>().ok())
        .unwrap_or(0);
    let ended_at = if status == CallStatus::Completed {
        Some(OffsetDateTime::now_utc())
    } else {
        None
    };
    CallLogRepo::update_delivery(pool, call_log.id, status, duration, ended_at)
        .await
        .map_err(|e| {
            error!(error=%e, "failed to update call log");
            AppError("db error")
        })?;
    if let Some(outcome) = status.phone_outcome() {
        PhoneRepo::update_status(pool, record.id, outcome)
            .await
            .map_err(|e| {
                error!(error=%e, "failed to update phone record status");
                AppError("db error")
            })?;
    }
    info!(call_log_id = call_log.id, status = ?status, "updated call log from status callback");

    Ok(())
}
