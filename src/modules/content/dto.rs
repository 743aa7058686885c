use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::model::{ContentOptions, NewContent, Platform};
use crate::common::error::AppError;
use crate::modules::scheduler::service::Delivery;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentRequest {
    pub platform: Platform,
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2200, message = "caption must be at most 2200 characters"))]
    pub caption: Option<String>,
    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub media_key: Option<String>,
    #[validate(url(message = "mediaUrl must be a valid URL"))]
    pub media_url: Option<String>,
    pub thumbnail_key: Option<String>,
    #[serde(default)]
    pub options: ContentOptions,
    /// Leave empty to keep the item as a draft.
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub scheduled_at: Option<OffsetDateTime>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl CreateContentRequest {
    /// Field rules that depend on the target platform.
    pub fn check_platform_rules(&self) -> Result<(), AppError> {
        match self.platform {
            Platform::Instagram => {
                if is_blank(&self.caption) {
                    return Err(AppError::Validation("Instagram posts require a caption".to_string()));
                }
                if is_blank(&self.media_key) && is_blank(&self.media_url) {
                    return Err(AppError::Validation("Instagram posts require a video".to_string()));
                }
            }
            Platform::Youtube => {
                if is_blank(&self.title) {
                    return Err(AppError::Validation("YouTube videos require a title".to_string()));
                }
                if is_blank(&self.media_key) {
                    return Err(AppError::Validation("YouTube videos require an uploaded video".to_string()));
                }
            }
        }
        Ok(())
    }

    pub fn into_new(self, owner_id: Uuid) -> NewContent {
        NewContent {
            owner_id,
            title: self.title,
            caption: self.caption,
            description: self.description,
            tags: self.tags,
            media_key: self.media_key,
            media_url: self.media_url,
            thumbnail_key: self.thumbnail_key,
            options: self.options,
            scheduled_at: self.scheduled_at,
        }
    }
}

/// Envelope returned by retry and direct publish.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub content_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_url: Option<String>,
    /// The platform is still processing; the poller will finish the post.
    pub pending: bool,
}

impl PublishResponse {
    pub fn from_delivery(content_id: Uuid, delivery: Delivery) -> Self {
        match delivery {
            Delivery::Published(published) => Self {
                success: true,
                content_id,
                published_post_id: Some(published.post_id),
                published_url: published.url,
                pending: false,
            },
            Delivery::Pending { .. } => Self {
                success: true,
                content_id,
                published_post_id: None,
                published_url: None,
                pending: true,
            },
        }
    }
}
