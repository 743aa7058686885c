use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::common::response::ApiError;

/// Error taxonomy shared by handlers, the dispatcher and the platform adapters.
///
/// The dispatcher never interprets variants beyond logging them; the message
/// is stored verbatim on the content item and the publish job.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Credential(String),

    #[error("{0}")]
    Publish(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    StorageCleanup(String),

    #[error("{0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Credential(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Publish(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::StorageCleanup(_)
            | AppError::Storage(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for the error body's `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotFound(_) => "Not found",
            AppError::Validation(_) => "Validation failed",
            AppError::Conflict(_) => "Conflict",
            AppError::Credential(_) => "Platform credentials unavailable",
            AppError::Publish(_) => "Publish failed",
            AppError::Timeout(_) => "Publish timed out",
            AppError::StorageCleanup(_) | AppError::Storage(_) => "Storage error",
            AppError::Database(_) | AppError::Internal(_) => "Internal server error",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        ApiError::with_details(self.kind(), &self.to_string(), status).into_response()
    }
}
