use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use super::{
    PlatformPublisher, PollOutcome, PublishOutcome, PublishedRef, discard_temp_media, request_error,
};
use crate::common::error::AppError;
use crate::infrastructure::storage::s3::MediaStorage;
use crate::modules::content::model::{Content, ContentOptions, Platform};
use crate::modules::credentials::model::PlatformCredential;

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Deserialize)]
struct ContainerStatusResponse {
    status_code: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct PermalinkResponse {
    permalink: Option<String>,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    error: GraphError,
}

#[derive(Deserialize)]
struct GraphError {
    message: String,
}

/// Instagram Graph API client for Reels publishing.
#[derive(Clone)]
pub struct InstagramClient {
    http: Client,
    graph_url: String,
}

impl InstagramClient {
    pub fn new(http: Client, graph_url: &str) -> Self {
        Self {
            http,
            graph_url: graph_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        Url::parse(&format!("{}/{}", self.graph_url, path))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid Graph API URL: {}", e)))
    }

    async fn graph_error(res: Response) -> AppError {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        match serde_json::from_str::<GraphErrorBody>(&body) {
            Ok(parsed) => AppError::Publish(parsed.error.message),
            Err(_) => AppError::Publish(format!("Instagram API returned {}: {}", status, body)),
        }
    }

    /// Creates a Reels processing container and returns its id.
    pub async fn create_container(
        &self,
        ig_user_id: &str,
        access_token: &str,
        media_url: &str,
        caption: &str,
        options: &ContentOptions,
    ) -> Result<String, AppError> {
        let url = self.endpoint(&format!("{}/media", ig_user_id))?;
        let thumb_offset_ms = (options.thumb_offset_secs() * 1000).to_string();
        let share_to_feed = options.share_to_feed().to_string();

        let params = [
            ("media_type", "REELS"),
            ("video_url", media_url),
            ("caption", caption),
            ("share_to_feed", share_to_feed.as_str()),
            ("thumb_offset", thumb_offset_ms.as_str()),
            ("access_token", access_token),
        ];

        let res = self
            .http
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| request_error(Platform::Instagram, e))?;

        if !res.status().is_success() {
            return Err(Self::graph_error(res).await);
        }

        let created: IdResponse = res.json().await.map_err(|e| request_error(Platform::Instagram, e))?;
        Ok(created.id)
    }

    async fn container_status(&self, container_id: &str, access_token: &str) -> Result<ContainerStatusResponse, AppError> {
        let mut url = self.endpoint(container_id)?;
        url.query_pairs_mut()
            .append_pair("fields", "status_code,status")
            .append_pair("access_token", access_token);

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(Platform::Instagram, e))?;

        if !res.status().is_success() {
            return Err(Self::graph_error(res).await);
        }

        res.json().await.map_err(|e| request_error(Platform::Instagram, e))
    }

    async fn publish_container(&self, ig_user_id: &str, access_token: &str, container_id: &str) -> Result<String, AppError> {
        let url = self.endpoint(&format!("{}/media_publish", ig_user_id))?;
        let params = [("creation_id", container_id), ("access_token", access_token)];

        let res = self
            .http
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| request_error(Platform::Instagram, e))?;

        if !res.status().is_success() {
            return Err(Self::graph_error(res).await);
        }

        let published: IdResponse = res.json().await.map_err(|e| request_error(Platform::Instagram, e))?;
        Ok(published.id)
    }

    async fn permalink(&self, media_id: &str, access_token: &str) -> Option<String> {
        let mut url = self.endpoint(media_id).ok()?;
        url.query_pairs_mut()
            .append_pair("fields", "permalink")
            .append_pair("access_token", access_token);

        let res = self.http.get(url).send().await.ok()?;
        if !res.status().is_success() {
            return None;
        }
        res.json::<PermalinkResponse>().await.ok()?.permalink
    }

    /// Checks a container and publishes it once Instagram finished processing.
    pub async fn check_and_publish_container(
        &self,
        ig_user_id: &str,
        access_token: &str,
        container_id: &str,
    ) -> Result<PollOutcome, AppError> {
        let status = self.container_status(container_id, access_token).await?;

        match status.status_code.as_deref() {
            Some("FINISHED") => {
                let media_id = self.publish_container(ig_user_id, access_token, container_id).await?;
                let url = self.permalink(&media_id, access_token).await;
                Ok(PollOutcome::Published(PublishedRef { post_id: media_id, url }))
            }
            Some("PUBLISHED") => Ok(PollOutcome::Published(PublishedRef {
                post_id: container_id.to_string(),
                url: None,
            })),
            Some(code @ ("ERROR" | "EXPIRED")) => Ok(PollOutcome::Failed(format!(
                "Instagram container {}: {}",
                code,
                status.status.unwrap_or_else(|| "no details".to_string())
            ))),
            _ => Ok(PollOutcome::Processing),
        }
    }
}

pub struct InstagramPublisher {
    client: InstagramClient,
    media: Arc<dyn MediaStorage>,
}

impl InstagramPublisher {
    pub fn new(client: InstagramClient, media: Arc<dyn MediaStorage>) -> Self {
        Self { client, media }
    }

    fn account_id(credential: &PlatformCredential) -> Result<&str, AppError> {
        credential
            .account_id
            .as_deref()
            .ok_or_else(|| AppError::Credential("Instagram business account id is missing".to_string()))
    }
}

#[async_trait]
impl PlatformPublisher for InstagramPublisher {
    async fn publish(
        &self,
        content: &Content,
        credential: &PlatformCredential,
    ) -> Result<PublishOutcome, AppError> {
        let ig_user_id = Self::account_id(credential)?;

        let media_url = match (&content.media_url, &content.media_key) {
            (Some(url), _) => url.clone(),
            (None, Some(key)) => self.media.public_url(key),
            (None, None) => {
                return Err(AppError::Validation("Instagram content requires a media URL".to_string()));
            }
        };

        let container_id = self
            .client
            .create_container(
                ig_user_id,
                &credential.access_token,
                &media_url,
                &content.caption_text(),
                &content.options,
            )
            .await?;

        info!(content_id = %content.id, container_id = %container_id, "📦 Created Instagram container");
        Ok(PublishOutcome::Pending { handle: container_id })
    }

    async fn poll(
        &self,
        content: &Content,
        handle: &str,
        credential: &PlatformCredential,
    ) -> Result<PollOutcome, AppError> {
        let ig_user_id = Self::account_id(credential)?;
        let outcome = self
            .client
            .check_and_publish_container(ig_user_id, &credential.access_token, handle)
            .await?;

        match &outcome {
            PollOutcome::Published(published) => {
                info!(content_id = %content.id, media_id = %published.post_id, "✅ Instagram reel published");
                if let Some(key) = &content.media_key {
                    discard_temp_media(self.media.as_ref(), content, key).await;
                }
            }
            PollOutcome::Failed(reason) => {
                warn!(content_id = %content.id, container_id = handle, reason = %reason, "Instagram container failed");
            }
            PollOutcome::Processing => {}
        }

        Ok(outcome)
    }
}
