use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "content_platform", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Youtube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Youtube => "YouTube",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "content_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Scheduled,
    Processing,
    /// Remote container created, waiting for the poller to finalize it.
    ProcessingPendingPoll,
    Published,
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Scheduled => "scheduled",
            ContentStatus::Processing => "processing",
            ContentStatus::ProcessingPendingPoll => "processing_pending_poll",
            ContentStatus::Published => "published",
            ContentStatus::Failed => "failed",
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, ContentStatus::Processing | ContentStatus::ProcessingPendingPoll)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ContentStatus::Published | ContentStatus::Failed)
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content status moves forward only; `failed -> processing` is the single
/// backwards edge and is reserved for explicit retries.
pub fn can_transition(from: ContentStatus, to: ContentStatus) -> bool {
    use ContentStatus::*;

    matches!(
        (from, to),
        (Draft, Scheduled)
            | (Draft, Processing)
            | (Scheduled, Processing)
            | (Processing, ProcessingPendingPoll)
            | (Processing, Published)
            | (Processing, Failed)
            | (ProcessingPendingPoll, Published)
            | (ProcessingPendingPoll, Failed)
            | (Failed, Processing)
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Private => "private",
        }
    }
}

pub const MAX_THUMB_OFFSET_SECS: i32 = 60;
pub const DEFAULT_YOUTUBE_CATEGORY: &str = "22";

/// Per-platform publish options. Unset fields fall back to platform defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_to_feed: Option<bool>,
    /// Reel cover frame offset in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_offset: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_status: Option<PrivacyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl ContentOptions {
    pub fn share_to_feed(&self) -> bool {
        self.share_to_feed.unwrap_or(true)
    }

    pub fn thumb_offset_secs(&self) -> i32 {
        self.thumb_offset.unwrap_or(0).clamp(0, MAX_THUMB_OFFSET_SECS)
    }

    pub fn privacy_status(&self) -> PrivacyStatus {
        self.privacy_status.unwrap_or_default()
    }

    pub fn category_id(&self) -> &str {
        self.category_id.as_deref().unwrap_or(DEFAULT_YOUTUBE_CATEGORY)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub platform: Platform,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub media_key: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_key: Option<String>,
    pub options: ContentOptions,
    pub status: ContentStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub scheduled_at: Option<OffsetDateTime>,
    pub remote_container_id: Option<String>,
    pub poll_attempts: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub next_poll_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub published_at: Option<OffsetDateTime>,
    pub published_post_id: Option<String>,
    pub published_url: Option<String>,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

/// Fields supplied by the composer when a content item is created.
#[derive(Debug, Clone, Default)]
pub struct NewContent {
    pub owner_id: Uuid,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub media_key: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_key: Option<String>,
    pub options: ContentOptions,
    pub scheduled_at: Option<OffsetDateTime>,
}

impl Content {
    pub fn from_new(new: NewContent, platform: Platform, now: OffsetDateTime) -> Self {
        let status = if new.scheduled_at.is_some() {
            ContentStatus::Scheduled
        } else {
            ContentStatus::Draft
        };

        Self {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            platform,
            title: new.title,
            caption: new.caption,
            description: new.description,
            tags: new.tags,
            media_key: new.media_key,
            media_url: new.media_url,
            thumbnail_key: new.thumbnail_key,
            options: new.options,
            status,
            scheduled_at: new.scheduled_at,
            remote_container_id: None,
            poll_attempts: 0,
            next_poll_at: None,
            published_at: None,
            published_post_id: None,
            published_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Caption text sent to the platform, falling back to the description.
    pub fn caption_text(&self) -> String {
        self.caption
            .clone()
            .or_else(|| self.description.clone())
            .unwrap_or_default()
    }
}
