use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::DirectPublishRequest;
use crate::common::error::AppError;
use crate::modules::content::dto::PublishResponse;
use crate::modules::content::model::{Content, ContentStatus, Platform};
use crate::modules::content::service::ContentService;
use crate::modules::publish_job::model::{NewPublishJob, source};
use crate::modules::scheduler::service::SchedulerService;
use crate::state::AppState;

pub struct PublishService;

impl PublishService {
    /// Publishes immediately, outside the schedule. One-off posts are
    /// stored as a draft first so they get the same history as scheduled ones.
    pub async fn publish_now(
        state: &AppState,
        owner_id: Uuid,
        platform: Platform,
        req: DirectPublishRequest,
    ) -> Result<PublishResponse, AppError> {
        let content = match req.content_id {
            Some(id) => {
                let content = ContentService::get(state, owner_id, id).await?;
                if content.platform != platform {
                    return Err(AppError::Validation(format!(
                        "Content targets {}, not {}",
                        content.platform.display_name(),
                        platform.display_name()
                    )));
                }
                content
            }
            None => ContentService::create(state, owner_id, req.into_create(platform)).await?,
        };

        let from = match content.status {
            ContentStatus::Draft | ContentStatus::Failed => content.status,
            status => {
                return Err(AppError::Conflict(format!("Content cannot be published while {}", status)));
            }
        };

        let now = OffsetDateTime::now_utc();
        if !state
            .content
            .transition(content.id, from, ContentStatus::Processing, now)
            .await?
        {
            return Err(AppError::Conflict("Content is already being published".to_string()));
        }

        let claimed = Content {
            status: ContentStatus::Processing,
            error: None,
            ..content
        };

        if let Err(e) = state.jobs.insert(NewPublishJob::started(&claimed, source::API, now)).await {
            warn!(content_id = %claimed.id, error = %e, "Failed to record publish job");
            state.content.mark_failed(claimed.id, &e.to_string(), now).await?;
            return Err(e);
        }

        info!(content_id = %claimed.id, platform = %platform, "🚀 Publishing now");

        let delivery = SchedulerService::drive(state, &claimed, source::API, now).await?;
        Ok(PublishResponse::from_delivery(claimed.id, delivery))
    }
}
