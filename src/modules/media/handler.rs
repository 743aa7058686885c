use crate::common::error::AppError;
use crate::common::response::{ApiResponse, ApiSuccess, ErrorBody};
use crate::common::upload::{MediaKind, read_limited};
use crate::middleware::auth::TokenClaims;
use crate::state::AppState;
use axum::{
    Extension,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedMedia {
    /// Storage key to reference from content (`mediaKey` / `thumbnailKey`).
    pub key: String,
    pub url: String,
}

async fn store_upload(state: &AppState, owner_id: Uuid, mut multipart: Multipart) -> Result<UploadedMedia, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let (kind, ext) = MediaKind::from_content_type(&content_type).ok_or_else(|| {
            AppError::Validation(format!(
                "Unsupported file type {}: only video/mp4, image/jpeg and image/png are allowed",
                content_type
            ))
        })?;

        let body = read_limited(field, kind.max_bytes()).await?;
        let key = format!("uploads/{}/{}.{}", owner_id, Uuid::new_v4(), ext);
        let size = body.len();
        let url = state.media.store(&key, body, &content_type).await?;

        info!(owner_id = %owner_id, key = %key, size, "📤 Media uploaded");
        return Ok(UploadedMedia { key, url });
    }

    Err(AppError::Validation("Missing 'file' field".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/v1/media",
    request_body(content_type = "multipart/form-data", description = "Field `file`: video/mp4 up to 100 MB or image/jpeg, image/png up to 2 MB"),
    responses(
        (status = 201, description = "Media stored", body = ApiResponse<UploadedMedia>),
        (status = 400, description = "Unsupported or oversized file", body = ErrorBody)
    ),
    tag = "Media",
    security(("bearer_auth" = []))
)]
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    multipart: Multipart,
) -> impl IntoResponse {
    match store_upload(&state, claims.sub, multipart).await {
        Ok(res) => ApiSuccess(ApiResponse::success(res, "Media uploaded successfully"), StatusCode::CREATED).into_response(),
        Err(e) => e.into_response(),
    }
}
