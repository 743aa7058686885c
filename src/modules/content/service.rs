use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::dto::{CreateContentRequest, PublishResponse};
use super::model::{Content, ContentStatus};
use crate::common::error::AppError;
use crate::modules::publish_job::model::{PublishJob, source};
use crate::modules::scheduler::service::SchedulerService;
use crate::state::AppState;

pub struct ContentService;

impl ContentService {
    pub async fn create(state: &AppState, owner_id: Uuid, req: CreateContentRequest) -> Result<Content, AppError> {
        req.validate()?;
        req.check_platform_rules()?;

        let platform = req.platform;
        let content = Content::from_new(req.into_new(owner_id), platform, OffsetDateTime::now_utc());
        state.content.insert(&content).await?;

        info!(content_id = %content.id, platform = %platform, status = %content.status, "📝 Content created");
        Ok(content)
    }

    pub async fn list(state: &AppState, owner_id: Uuid) -> Result<Vec<Content>, AppError> {
        state.content.list_by_owner(owner_id).await
    }

    /// Loads an item the caller owns.
    pub async fn get(state: &AppState, owner_id: Uuid, id: Uuid) -> Result<Content, AppError> {
        let content = state
            .content
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Content not found".to_string()))?;

        if content.owner_id != owner_id {
            return Err(AppError::Forbidden("You do not own this content".to_string()));
        }
        Ok(content)
    }

    pub async fn jobs(state: &AppState, owner_id: Uuid, id: Uuid) -> Result<Vec<PublishJob>, AppError> {
        let content = Self::get(state, owner_id, id).await?;
        state.jobs.list_for_content(content.id).await
    }

    /// Re-drives a failed item through the dispatcher's publish path.
    pub async fn retry(state: &AppState, owner_id: Uuid, id: Uuid) -> Result<PublishResponse, AppError> {
        let content = Self::get(state, owner_id, id).await?;

        match content.status {
            ContentStatus::Failed => {}
            ContentStatus::Published => {
                return Err(AppError::Conflict("Content is already published".to_string()));
            }
            status => {
                return Err(AppError::Conflict(format!(
                    "Only failed content can be retried, this item is {}",
                    status
                )));
            }
        }

        let now = OffsetDateTime::now_utc();
        if !state
            .content
            .transition(id, ContentStatus::Failed, ContentStatus::Processing, now)
            .await?
        {
            return Err(AppError::Conflict("Content is already being retried".to_string()));
        }

        info!(content_id = %id, platform = %content.platform, "🔁 Retrying publish");

        let claimed = Content {
            status: ContentStatus::Processing,
            error: None,
            ..content
        };
        let delivery = SchedulerService::drive(state, &claimed, source::RETRY, now).await?;
        Ok(PublishResponse::from_delivery(id, delivery))
    }
}
