use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, header};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use super::{PlatformPublisher, PublishOutcome, PublishedRef, discard_temp_media, request_error};
use crate::common::error::AppError;
use crate::infrastructure::storage::s3::MediaStorage;
use crate::modules::content::model::{Content, Platform, PrivacyStatus};
use crate::modules::credentials::model::{PlatformCredential, TokenGrant};
use crate::modules::credentials::service::TokenRefresher;

pub struct VideoUpload {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy_status: PrivacyStatus,
    pub video: Bytes,
    pub content_type: String,
    pub thumbnail: Option<(Bytes, String)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedVideo {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GoogleError {
    Detailed { message: String },
    // OAuth endpoints answer with {"error": "invalid_grant", "error_description": ...}
    Code(String),
}

#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    upload_http: Client,
    upload_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl YouTubeClient {
    pub fn new(
        http: Client,
        upload_http: Client,
        upload_url: &str,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        Self {
            http,
            upload_http,
            upload_url: upload_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    async fn google_error(res: Response) -> AppError {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        match serde_json::from_str::<GoogleErrorBody>(&body) {
            Ok(GoogleErrorBody { error: GoogleError::Detailed { message } }) => AppError::Publish(message),
            Ok(GoogleErrorBody { error: GoogleError::Code(code) }) => AppError::Publish(code),
            Err(_) => AppError::Publish(format!("YouTube API returned {}: {}", status, body)),
        }
    }

    fn upload_endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, AppError> {
        let mut url = Url::parse(&format!("{}/{}", self.upload_url, path))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid YouTube upload URL: {}", e)))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    /// Uploads a video through a resumable session and returns the created
    /// resource. Thumbnail failures are logged, not returned.
    pub async fn upload_video(&self, access_token: &str, upload: VideoUpload) -> Result<UploadedVideo, AppError> {
        // 1. Open resumable session
        let init_url = self.upload_endpoint(
            "videos",
            &[("uploadType", "resumable"), ("part", "snippet,status")],
        )?;
        let metadata = json!({
            "snippet": {
                "title": upload.title,
                "description": upload.description,
                "tags": upload.tags,
                "categoryId": upload.category_id,
            },
            "status": {
                "privacyStatus": upload.privacy_status.as_str(),
                "selfDeclaredMadeForKids": false,
            }
        });

        let res = self
            .http
            .post(init_url)
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", &upload.content_type)
            .header("X-Upload-Content-Length", upload.video.len().to_string())
            .json(&metadata)
            .send()
            .await
            .map_err(|e| request_error(Platform::Youtube, e))?;

        if !res.status().is_success() {
            return Err(Self::google_error(res).await);
        }

        let session_url = res
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AppError::Publish("YouTube did not return an upload session".to_string()))?;

        // 2. Send the bytes
        let res = self
            .upload_http
            .put(&session_url)
            .bearer_auth(access_token)
            .header(header::CONTENT_TYPE, &upload.content_type)
            .body(upload.video)
            .send()
            .await
            .map_err(|e| request_error(Platform::Youtube, e))?;

        if !res.status().is_success() {
            return Err(Self::google_error(res).await);
        }

        let video: UploadedVideo = res.json().await.map_err(|e| request_error(Platform::Youtube, e))?;

        // 3. Optional custom thumbnail
        if let Some((thumbnail, content_type)) = upload.thumbnail {
            if let Err(e) = self.set_thumbnail(access_token, &video.id, thumbnail, &content_type).await {
                warn!(video_id = %video.id, error = %e, "Failed to set YouTube thumbnail");
            }
        }

        Ok(video)
    }

    async fn set_thumbnail(&self, access_token: &str, video_id: &str, image: Bytes, content_type: &str) -> Result<(), AppError> {
        let url = self.upload_endpoint("thumbnails/set", &[("videoId", video_id)])?;
        let res = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .header(header::CONTENT_TYPE, content_type)
            .body(image)
            .send()
            .await
            .map_err(|e| request_error(Platform::Youtube, e))?;

        if !res.status().is_success() {
            return Err(Self::google_error(res).await);
        }
        Ok(())
    }
}

#[async_trait]
impl TokenRefresher for YouTubeClient {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let res = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| request_error(Platform::Youtube, e))?;

        if !res.status().is_success() {
            return Err(Self::google_error(res).await);
        }

        res.json().await.map_err(|e| request_error(Platform::Youtube, e))
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

pub struct YouTubePublisher {
    client: Arc<YouTubeClient>,
    media: Arc<dyn MediaStorage>,
}

impl YouTubePublisher {
    pub fn new(client: Arc<YouTubeClient>, media: Arc<dyn MediaStorage>) -> Self {
        Self { client, media }
    }

    async fn load_thumbnail(&self, content: &Content) -> Option<(Bytes, String)> {
        let key = content.thumbnail_key.as_deref()?;
        match self.media.fetch(key).await {
            Ok(bytes) => {
                let content_type = mime_guess::from_path(key).first_or(mime_guess::mime::IMAGE_JPEG);
                Some((bytes, content_type.to_string()))
            }
            Err(e) => {
                warn!(content_id = %content.id, key, error = %e, "Skipping unreadable thumbnail");
                None
            }
        }
    }
}

#[async_trait]
impl PlatformPublisher for YouTubePublisher {
    async fn publish(
        &self,
        content: &Content,
        credential: &PlatformCredential,
    ) -> Result<PublishOutcome, AppError> {
        let title = content
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Validation("YouTube content requires a title".to_string()))?;
        let media_key = content
            .media_key
            .as_deref()
            .ok_or_else(|| AppError::Validation("YouTube content requires an uploaded video".to_string()))?;

        let video = self.media.fetch(media_key).await?;
        let content_type = mime_guess::from_path(media_key).first_or(mime_guess::mime::APPLICATION_OCTET_STREAM);
        let content_type = if content_type.type_() == mime_guess::mime::VIDEO {
            content_type.to_string()
        } else {
            "video/mp4".to_string()
        };

        let upload = VideoUpload {
            title,
            description: content.description.clone().or_else(|| content.caption.clone()).unwrap_or_default(),
            tags: content.tags.clone(),
            category_id: content.options.category_id().to_string(),
            privacy_status: content.options.privacy_status(),
            video,
            content_type,
            thumbnail: self.load_thumbnail(content).await,
        };

        let uploaded = self.client.upload_video(&credential.access_token, upload).await?;
        info!(content_id = %content.id, video_id = %uploaded.id, "✅ YouTube video uploaded");

        discard_temp_media(self.media.as_ref(), content, media_key).await;
        if let Some(key) = &content.thumbnail_key {
            discard_temp_media(self.media.as_ref(), content, key).await;
        }

        Ok(PublishOutcome::Published(PublishedRef {
            url: Some(watch_url(&uploaded.id)),
            post_id: uploaded.id,
        }))
    }
}
