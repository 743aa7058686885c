use crate::common::response::ErrorBody;
use crate::middleware::auth::TokenClaims;
use crate::modules::content::dto::PublishResponse;
use crate::modules::content::model::Platform;
use crate::modules::publish::dto::DirectPublishRequest;
use crate::modules::publish::service::PublishService;
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Publish immediately
#[utoipa::path(
    post,
    path = "/api/v1/publish/{platform}",
    params(
        ("platform" = Platform, Path, description = "instagram or youtube")
    ),
    request_body = DirectPublishRequest,
    responses(
        (status = 200, description = "Published or handed to the poller", body = PublishResponse),
        (status = 400, description = "Invalid request or account unavailable", body = ErrorBody),
        (status = 409, description = "Content is not publishable", body = ErrorBody),
        (status = 502, description = "Platform rejected the publish", body = ErrorBody),
        (status = 504, description = "Platform did not answer in time", body = ErrorBody)
    ),
    tag = "Publish",
    security(("bearer_auth" = []))
)]
pub async fn publish_now(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(platform): Path<Platform>,
    Json(req): Json<DirectPublishRequest>,
) -> impl IntoResponse {
    match PublishService::publish_now(&state, claims.sub, platform, req).await {
        Ok(res) => (StatusCode::OK, Json(res)).into_response(),
        Err(e) => e.into_response(),
    }
}
