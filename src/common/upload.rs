use crate::common::error::AppError;
use axum::body::Bytes;
use axum::extract::multipart::Field;
use futures_util::StreamExt;
use tracing::error;

pub const MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Upload kinds accepted by the media endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Maps a declared content type to a kind and file extension.
    pub fn from_content_type(content_type: &str) -> Option<(Self, &'static str)> {
        match content_type {
            "video/mp4" => Some((MediaKind::Video, "mp4")),
            "image/jpeg" => Some((MediaKind::Image, "jpg")),
            "image/png" => Some((MediaKind::Image, "png")),
            _ => None,
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            MediaKind::Video => MAX_VIDEO_BYTES,
            MediaKind::Image => MAX_IMAGE_BYTES,
        }
    }
}

/// Drains a multipart field chunk by chunk, failing as soon as it grows
/// past `limit` bytes.
pub async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Bytes, AppError> {
    let mut buffer = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            error!("Stream error: {}", e);
            AppError::Validation("Upload stream interrupted".to_string())
        })?;

        if buffer.len() + chunk.len() > limit {
            return Err(AppError::Validation(format!(
                "File exceeds the {} MB limit",
                limit / (1024 * 1024)
            )));
        }
        buffer.extend_from_slice(&chunk);
    }

    if buffer.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    Ok(Bytes::from(buffer))
}
