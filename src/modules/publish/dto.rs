use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::content::dto::CreateContentRequest;
use crate::modules::content::model::{ContentOptions, Platform};

/// Either `contentId` of an existing item, or the fields of a one-off post.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectPublishRequest {
    pub content_id: Option<Uuid>,
    pub media_url: Option<String>,
    pub media_key: Option<String>,
    pub caption: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub thumbnail_key: Option<String>,
    #[serde(default)]
    pub options: ContentOptions,
}

impl DirectPublishRequest {
    pub fn into_create(self, platform: Platform) -> CreateContentRequest {
        CreateContentRequest {
            platform,
            title: self.title,
            caption: self.caption,
            description: self.description,
            tags: self.tags,
            media_key: self.media_key,
            media_url: self.media_url,
            thumbnail_key: self.thumbnail_key,
            options: self.options,
            scheduled_at: None,
        }
    }
}
