use crate::common::response::{ApiResponse, ApiSuccess, ErrorBody};
use crate::middleware::auth::TokenClaims;
use crate::modules::content::dto::*;
use crate::modules::content::model::Content;
use crate::modules::content::service::ContentService;
use crate::modules::publish_job::model::PublishJob;
use crate::state::AppState;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/contents",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Content Created", body = ApiResponse<Content>),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn create_content(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Json(req): Json<CreateContentRequest>,
) -> impl IntoResponse {
    match ContentService::create(&state, claims.sub, req).await {
        Ok(res) => ApiSuccess(ApiResponse::success(res, "Content created successfully"), StatusCode::CREATED).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/contents",
    responses(
        (status = 200, description = "List Content", body = ApiResponse<Vec<Content>>),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn list_contents(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> impl IntoResponse {
    match ContentService::list(&state, claims.sub).await {
        Ok(res) => ApiSuccess(ApiResponse::success(res, "Content retrieved successfully"), StatusCode::OK).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/contents/{id}",
    params(
        ("id" = Uuid, Path, description = "Content ID")
    ),
    responses(
        (status = 200, description = "Get Content", body = ApiResponse<Content>),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Content Not Found", body = ErrorBody)
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn get_content(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match ContentService::get(&state, claims.sub, id).await {
        Ok(res) => ApiSuccess(ApiResponse::success(res, "Content retrieved successfully"), StatusCode::OK).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/contents/{id}/jobs",
    params(
        ("id" = Uuid, Path, description = "Content ID")
    ),
    responses(
        (status = 200, description = "Publish history, newest first", body = ApiResponse<Vec<PublishJob>>),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Content Not Found", body = ErrorBody)
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn list_content_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match ContentService::jobs(&state, claims.sub, id).await {
        Ok(res) => ApiSuccess(ApiResponse::success(res, "Publish jobs retrieved successfully"), StatusCode::OK).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Retry a failed publish
#[utoipa::path(
    post,
    path = "/api/v1/contents/{id}/retry",
    params(
        ("id" = Uuid, Path, description = "Content ID")
    ),
    responses(
        (status = 200, description = "Published or handed to the poller", body = PublishResponse),
        (status = 400, description = "Platform account unavailable", body = ErrorBody),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Content Not Found", body = ErrorBody),
        (status = 409, description = "Content is not in a retryable state", body = ErrorBody),
        (status = 502, description = "Platform rejected the publish", body = ErrorBody)
    ),
    tag = "Content",
    security(("bearer_auth" = []))
)]
pub async fn retry_content(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match ContentService::retry(&state, claims.sub, id).await {
        Ok(res) => (StatusCode::OK, Json(res)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::modules::content::model::{ContentStatus, Platform};
    use crate::testing::{Harness, bearer_token, body_json};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(harness: &Harness) -> axum::Router {
        let state = harness.state();
        crate::modules::content::router(state.clone()).with_state(state)
    }

    #[tokio::test]
    async fn requests_without_token_are_unauthorized() {
        let harness = Harness::new();
        let req = Request::builder().uri("/contents").body(Body::empty()).unwrap();

        let res = app(&harness).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_returns_scheduled_content() {
        let harness = Harness::new();
        let owner = Uuid::new_v4();
        let body = serde_json::json!({
            "platform": "youtube",
            "title": "Studio tour",
            "mediaKey": "uploads/u/tour.mp4",
            "tags": ["studio"],
            "options": { "privacyStatus": "unlisted" },
            "scheduledAt": "2030-01-01T09:00:00Z"
        });
        let req = Request::builder()
            .method("POST")
            .uri("/contents")
            .header(header::AUTHORIZATION, bearer_token(owner))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let res = app(&harness).oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        let json = body_json(res).await;
        assert_eq!(json["data"]["status"], "scheduled");
        assert_eq!(json["data"]["platform"], "youtube");
        assert_eq!(json["data"]["options"]["privacyStatus"], "unlisted");
        assert_eq!(json["data"]["ownerId"], owner.to_string());
    }

    #[tokio::test]
    async fn create_rejects_instagram_post_without_caption() {
        let harness = Harness::new();
        let body = serde_json::json!({ "platform": "instagram", "mediaKey": "uploads/u/reel.mp4" });
        let req = Request::builder()
            .method("POST")
            .uri("/contents")
            .header(header::AUTHORIZATION, bearer_token(Uuid::new_v4()))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let res = app(&harness).oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["details"], "Instagram posts require a caption");
    }

    #[tokio::test]
    async fn retry_of_published_item_is_a_conflict() {
        let harness = Harness::new();
        let owner = Uuid::new_v4();
        let content = harness.seed_with_status(owner, Platform::Youtube, ContentStatus::Published);
        let req = Request::builder()
            .method("POST")
            .uri(format!("/contents/{}/retry", content.id))
            .header(header::AUTHORIZATION, bearer_token(owner))
            .body(Body::empty())
            .unwrap();

        let res = app(&harness).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn retry_reports_published_post_id() {
        let harness = Harness::new();
        let owner = Uuid::new_v4();
        harness.connect(owner, Platform::Youtube, None).await;
        let content = harness.seed_with_status(owner, Platform::Youtube, ContentStatus::Failed);
        let req = Request::builder()
            .method("POST")
            .uri(format!("/contents/{}/retry", content.id))
            .header(header::AUTHORIZATION, bearer_token(owner))
            .body(Body::empty())
            .unwrap();

        let res = app(&harness).oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["publishedPostId"], format!("remote-{}", content.id));
        assert_eq!(json["pending"], false);
    }

    #[tokio::test]
    async fn retry_with_unconnected_account_reports_error_and_details() {
        let harness = Harness::new();
        let owner = Uuid::new_v4();
        let content = harness.seed_with_status(owner, Platform::Instagram, ContentStatus::Failed);
        let req = Request::builder()
            .method("POST")
            .uri(format!("/contents/{}/retry", content.id))
            .header(header::AUTHORIZATION, bearer_token(owner))
            .body(Body::empty())
            .unwrap();

        let res = app(&harness).oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["details"], "Instagram account not connected");
        assert_eq!(harness.content.snapshot(content.id).status, ContentStatus::Failed);
    }
}
