//! Platform publish adapters.
//!
//! Each adapter hides its upload choreography behind [`PlatformPublisher`].
//! Synchronous platforms answer `publish` with [`PublishOutcome::Published`];
//! asynchronous ones hand back a handle that the poller later resolves
//! through [`PlatformPublisher::poll`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::common::error::AppError;
use crate::infrastructure::storage::s3::MediaStorage;
use crate::modules::content::model::{Content, Platform};
use crate::modules::credentials::model::PlatformCredential;

pub mod instagram;
pub mod youtube;

/// Remote reference of a published post.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedRef {
    pub post_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published(PublishedRef),
    /// Remote processing continues; `handle` identifies it for polling.
    Pending { handle: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Processing,
    Published(PublishedRef),
    Failed(String),
}

#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    async fn publish(
        &self,
        content: &Content,
        credential: &PlatformCredential,
    ) -> Result<PublishOutcome, AppError>;

    async fn poll(
        &self,
        content: &Content,
        _handle: &str,
        _credential: &PlatformCredential,
    ) -> Result<PollOutcome, AppError> {
        Err(AppError::Publish(format!(
            "{} publishes synchronously and has nothing to poll",
            content.platform.display_name()
        )))
    }
}

#[derive(Clone, Default)]
pub struct PublisherRegistry {
    publishers: HashMap<Platform, Arc<dyn PlatformPublisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, platform: Platform, publisher: Arc<dyn PlatformPublisher>) -> Self {
        self.publishers.insert(platform, publisher);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformPublisher>> {
        self.publishers.get(&platform).cloned()
    }
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn request_error(platform: Platform, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(format!("{} request timed out", platform.display_name()))
    } else {
        AppError::Publish(format!("{} request failed: {}", platform.display_name(), err))
    }
}

/// Deletes a temporary blob once the platform holds its own copy.
/// Failures are logged and swallowed.
pub async fn discard_temp_media(media: &dyn MediaStorage, content: &Content, key: &str) {
    match media.delete(key).await {
        Ok(()) => info!(content_id = %content.id, key, "🧹 Deleted temporary media"),
        Err(e) => warn!(content_id = %content.id, key, error = %e, "Failed to delete temporary media"),
    }
}
