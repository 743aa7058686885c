use crate::common::error::AppError;
use crate::common::response::ApiError;
use crate::modules::publish_job::model::source;
use crate::modules::scheduler::dto::*;
use crate::modules::scheduler::service::SchedulerService;
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;

fn parse_trigger(body: &Bytes) -> Result<TriggerRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TriggerRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid trigger body: {}", e)))
}

fn run_failed(e: AppError) -> Response {
    ApiError::new(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
}

async fn dispatch(state: &AppState, req: TriggerRequest, default_source: &str) -> Response {
    let as_of = req.current_time.unwrap_or_else(OffsetDateTime::now_utc);
    let source = req.source.unwrap_or_else(|| default_source.to_string());
    match SchedulerService::run_due(state, as_of, &source).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => run_failed(e),
    }
}

async fn poll(state: &AppState, req: TriggerRequest, default_source: &str) -> Response {
    let as_of = req.current_time.unwrap_or_else(OffsetDateTime::now_utc);
    let source = req.source.unwrap_or_else(|| default_source.to_string());
    match SchedulerService::poll_pending(state, as_of, &source).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => run_failed(e),
    }
}

/// Publish all due content
#[utoipa::path(
    post,
    path = "/api/v1/cron/publish",
    request_body(content = TriggerRequest, description = "Optional as-of time and source tag"),
    responses(
        (status = 200, description = "Dispatch run finished", body = DispatchSummary),
        (status = 401, description = "Missing or invalid cron secret", body = crate::common::response::ErrorBody),
        (status = 500, description = "Dispatch run aborted", body = crate::common::response::ErrorBody)
    ),
    tag = "Scheduler",
    security(("cron_secret" = []))
)]
pub async fn trigger_publish(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    match parse_trigger(&body) {
        Ok(req) => dispatch(&state, req, source::CRON).await,
        Err(e) => e.into_response(),
    }
}

/// Manually publish all due content
#[utoipa::path(
    get,
    path = "/api/v1/cron/publish",
    params(ManualTriggerQuery),
    responses(
        (status = 200, description = "Dispatch run finished", body = DispatchSummary),
        (status = 401, description = "Missing or invalid cron secret", body = crate::common::response::ErrorBody),
        (status = 500, description = "Dispatch run aborted", body = crate::common::response::ErrorBody)
    ),
    tag = "Scheduler"
)]
pub async fn manual_publish(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, TriggerRequest::default(), source::MANUAL_TEST).await
}

/// Check pending Instagram containers
#[utoipa::path(
    post,
    path = "/api/v1/cron/instagram-poll",
    request_body(content = TriggerRequest, description = "Optional as-of time and source tag"),
    responses(
        (status = 200, description = "Poll run finished", body = PollSummary),
        (status = 401, description = "Missing or invalid cron secret", body = crate::common::response::ErrorBody),
        (status = 500, description = "Poll run aborted", body = crate::common::response::ErrorBody)
    ),
    tag = "Scheduler",
    security(("cron_secret" = []))
)]
pub async fn trigger_poll(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    match parse_trigger(&body) {
        Ok(req) => poll(&state, req, source::CRON).await,
        Err(e) => e.into_response(),
    }
}

/// Manually check pending Instagram containers
#[utoipa::path(
    get,
    path = "/api/v1/cron/instagram-poll",
    params(ManualTriggerQuery),
    responses(
        (status = 200, description = "Poll run finished", body = PollSummary),
        (status = 401, description = "Missing or invalid cron secret", body = crate::common::response::ErrorBody)
    ),
    tag = "Scheduler"
)]
pub async fn manual_poll(State(state): State<AppState>) -> impl IntoResponse {
    poll(&state, TriggerRequest::default(), source::MANUAL_TEST).await
}
