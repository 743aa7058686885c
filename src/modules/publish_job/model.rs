use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::modules::content::model::{Content, Platform, PrivacyStatus};

/// Provenance tags recorded on every ledger row.
pub mod source {
    pub const CRON: &str = "cron";
    pub const MANUAL_TEST: &str = "manual-test";
    pub const RETRY: &str = "retry";
    pub const API: &str = "api";
    pub const WORKER: &str = "worker";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "publish_job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PublishJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PublishJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishJobStatus::Completed | PublishJobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn succeeded(post_id: &str) -> Self {
        Self { success: true, post_id: Some(post_id.to_string()), error: None }
    }

    pub fn failed(error: &str) -> Self {
        Self { success: false, post_id: None, error: Some(error.to_string()) }
    }
}

/// Platform-specific snapshot of what was sent, keyed by platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum JobMetadata {
    #[serde(rename_all = "camelCase")]
    Instagram {
        media_type: String,
        is_reel: bool,
        share_to_feed: bool,
        thumb_offset: i32,
    },
    #[serde(rename_all = "camelCase")]
    Youtube {
        title: String,
        description: String,
        tags: Vec<String>,
        privacy_status: PrivacyStatus,
    },
}

impl JobMetadata {
    pub fn for_content(content: &Content) -> Self {
        match content.platform {
            Platform::Instagram => JobMetadata::Instagram {
                media_type: "REELS".to_string(),
                is_reel: true,
                share_to_feed: content.options.share_to_feed(),
                thumb_offset: content.options.thumb_offset_secs(),
            },
            Platform::Youtube => JobMetadata::Youtube {
                title: content.title.clone().unwrap_or_default(),
                description: content.description.clone().unwrap_or_default(),
                tags: content.tags.clone(),
                privacy_status: content.options.privacy_status(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishJob {
    pub id: Uuid,
    pub content_id: Uuid,
    pub owner_id: Uuid,
    pub platform: Platform,
    pub status: PublishJobStatus,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub scheduled_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub completed_at: Option<OffsetDateTime>,
    pub result: Option<JobResult>,
    pub metadata: JobMetadata,
    pub source: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPublishJob {
    pub content_id: Uuid,
    pub owner_id: Uuid,
    pub platform: Platform,
    pub status: PublishJobStatus,
    pub scheduled_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub result: Option<JobResult>,
    pub metadata: JobMetadata,
    pub source: String,
}

impl NewPublishJob {
    fn for_content(content: &Content, status: PublishJobStatus, source: &str, now: OffsetDateTime) -> Self {
        Self {
            content_id: content.id,
            owner_id: content.owner_id,
            platform: content.platform,
            status,
            scheduled_at: content.scheduled_at.unwrap_or(now),
            completed_at: None,
            result: None,
            metadata: JobMetadata::for_content(content),
            source: source.to_string(),
        }
    }

    pub fn started(content: &Content, source: &str, now: OffsetDateTime) -> Self {
        Self::for_content(content, PublishJobStatus::Processing, source, now)
    }

    pub fn completed(content: &Content, post_id: &str, source: &str, now: OffsetDateTime) -> Self {
        Self {
            completed_at: Some(now),
            result: Some(JobResult::succeeded(post_id)),
            ..Self::for_content(content, PublishJobStatus::Completed, source, now)
        }
    }

    pub fn failed(content: &Content, error: &str, source: &str, now: OffsetDateTime) -> Self {
        Self {
            completed_at: Some(now),
            result: Some(JobResult::failed(error)),
            ..Self::for_content(content, PublishJobStatus::Failed, source, now)
        }
    }

    pub fn into_job(self, id: Uuid, now: OffsetDateTime) -> PublishJob {
        PublishJob {
            id,
            content_id: self.content_id,
            owner_id: self.owner_id,
            platform: self.platform,
            status: self.status,
            scheduled_at: self.scheduled_at,
            completed_at: self.completed_at,
            result: self.result,
            metadata: self.metadata,
            source: self.source,
            created_at: now,
            updated_at: now,
        }
    }
}
