use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use super::dto::{DispatchSummary, PollSummary};
use crate::common::error::AppError;
use crate::infrastructure::platforms::{PlatformPublisher, PollOutcome, PublishOutcome, PublishedRef};
use crate::modules::content::model::{Content, ContentStatus, Platform};
use crate::modules::publish_job::model::NewPublishJob;
use crate::state::AppState;

/// What a successful drive left behind.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Published(PublishedRef),
    /// The platform is still processing; the poller owns the item now.
    Pending { container_id: String },
}

enum PollStep {
    Published,
    Failed,
    Pending,
    Skipped,
}

pub struct SchedulerService;

impl SchedulerService {
    /// Publishes every `scheduled` item due by `as_of + lookahead`.
    ///
    /// Items are claimed one at a time with a `scheduled -> processing`
    /// compare-and-swap, so overlapping runs never publish the same item
    /// twice. A failing item is recorded and the batch carries on; only a
    /// failure to read the due list aborts the run. Claims abandoned by an
    /// earlier run are failed first so they become retryable.
    pub async fn run_due(state: &AppState, as_of: OffsetDateTime, source: &str) -> Result<DispatchSummary, AppError> {
        let settings = &state.config.scheduler;
        let stale_count = Self::fail_stale_claims(state, as_of, source).await;

        let due = state
            .content
            .find_due(as_of + settings.lookahead(), settings.batch_size)
            .await?;

        info!(source, total_found = due.len(), as_of = %as_of, "🗓️ Dispatching due content");

        let mut processed_count = 0;
        let mut error_count = 0;

        for content in &due {
            match state
                .content
                .transition(content.id, ContentStatus::Scheduled, ContentStatus::Processing, as_of)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    info!(content_id = %content.id, "Skipping content claimed by another run");
                    continue;
                }
                Err(e) => {
                    error!(content_id = %content.id, error = %e, "Failed to claim content");
                    error_count += 1;
                    continue;
                }
            }

            let claimed = Content { status: ContentStatus::Processing, ..content.clone() };
            match Self::drive(state, &claimed, source, as_of).await {
                Ok(_) => processed_count += 1,
                Err(_) => error_count += 1,
            }
        }

        Self::prune_ledger(state).await;

        info!(source, processed_count, error_count, "✅ Dispatch run finished");

        Ok(DispatchSummary {
            success: true,
            processed_count,
            error_count,
            total_found: due.len(),
            stale_count,
            processed_at: as_of,
            source: source.to_string(),
        })
    }

    /// Runs one publish attempt for an item already in `processing` and
    /// records the outcome on the item and in the job ledger.
    ///
    /// Errors are returned after they have been recorded.
    pub async fn drive(
        state: &AppState,
        content: &Content,
        source: &str,
        now: OffsetDateTime,
    ) -> Result<Delivery, AppError> {
        match Self::attempt(state, content).await {
            Ok(PublishOutcome::Published(published)) => {
                Self::complete(state, content, &published, source, now).await?;
                Ok(Delivery::Published(published))
            }
            Ok(PublishOutcome::Pending { handle }) => {
                let next_poll_at = now + state.config.scheduler.poll_delay(1);
                state
                    .content
                    .mark_pending_poll(content.id, &handle, next_poll_at, now)
                    .await?;
                info!(content_id = %content.id, container_id = %handle, "⏳ Container created, waiting for processing");
                Ok(Delivery::Pending { container_id: handle })
            }
            Err(e) => {
                Self::fail(state, content, &e.to_string(), source, now).await?;
                Err(e)
            }
        }
    }

    /// Advances every `processing_pending_poll` item whose next check is due.
    pub async fn poll_pending(state: &AppState, as_of: OffsetDateTime, source: &str) -> Result<PollSummary, AppError> {
        let pollable = state
            .content
            .find_pollable(as_of, state.config.scheduler.batch_size)
            .await?;

        let mut summary = PollSummary {
            success: true,
            checked_count: 0,
            published_count: 0,
            failed_count: 0,
            pending_count: 0,
            processed_at: as_of,
            source: source.to_string(),
        };

        for content in &pollable {
            match Self::poll_one(state, content, source, as_of).await {
                Ok(PollStep::Skipped) => continue,
                Ok(PollStep::Published) => summary.published_count += 1,
                Ok(PollStep::Failed) => summary.failed_count += 1,
                Ok(PollStep::Pending) => summary.pending_count += 1,
                Err(e) => {
                    error!(content_id = %content.id, error = %e, "Failed to record container check");
                    summary.pending_count += 1;
                }
            }
            summary.checked_count += 1;
        }

        Ok(summary)
    }

    async fn poll_one(state: &AppState, content: &Content, source: &str, now: OffsetDateTime) -> Result<PollStep, AppError> {
        let settings = &state.config.scheduler;
        let Some(seen_next_poll_at) = content.next_poll_at else {
            return Ok(PollStep::Skipped);
        };
        let lease_until = now + time::Duration::seconds(settings.publish_timeout_secs as i64);
        if !state
            .content
            .lease_poll(content.id, content.poll_attempts, seen_next_poll_at, lease_until)
            .await?
        {
            return Ok(PollStep::Skipped);
        }

        let Some(container_id) = content.remote_container_id.as_deref() else {
            let message = format!("{} container id is missing", content.platform.display_name());
            Self::fail(state, content, &message, source, now).await?;
            return Ok(PollStep::Failed);
        };

        let outcome = match Self::check(state, content, container_id).await {
            Ok(outcome) => outcome,
            Err(e @ AppError::Credential(_)) => {
                Self::fail(state, content, &e.to_string(), source, now).await?;
                return Ok(PollStep::Failed);
            }
            Err(e) => {
                warn!(content_id = %content.id, container_id, error = %e, "Container check failed, will check again");
                PollOutcome::Processing
            }
        };

        match outcome {
            PollOutcome::Published(published) => {
                Self::complete(state, content, &published, source, now).await?;
                Ok(PollStep::Published)
            }
            PollOutcome::Failed(message) => {
                Self::fail(state, content, &message, source, now).await?;
                Ok(PollStep::Failed)
            }
            PollOutcome::Processing => {
                let attempts = content.poll_attempts + 1;
                if attempts >= settings.poll_max_attempts {
                    let message = format!(
                        "{} container processing timed out after {} poll attempts",
                        content.platform.display_name(),
                        attempts
                    );
                    Self::fail(state, content, &message, source, now).await?;
                    return Ok(PollStep::Failed);
                }

                let next_poll_at = now + settings.poll_delay(attempts + 1);
                state
                    .content
                    .record_poll_attempt(content.id, attempts, next_poll_at, now)
                    .await?;
                Ok(PollStep::Pending)
            }
        }
    }

    fn publisher(state: &AppState, platform: Platform) -> Result<Arc<dyn PlatformPublisher>, AppError> {
        state
            .publishers
            .get(platform)
            .ok_or_else(|| AppError::Credential(format!("{} publishing is not configured", platform.display_name())))
    }

    fn timed_out(platform: Platform, budget: Duration) -> AppError {
        AppError::Timeout(format!(
            "{} publish timed out after {}s",
            platform.display_name(),
            budget.as_secs()
        ))
    }

    async fn attempt(state: &AppState, content: &Content) -> Result<PublishOutcome, AppError> {
        let publisher = Self::publisher(state, content.platform)?;
        let credential = state
            .credentials
            .refresh_if_expired(content.owner_id, content.platform)
            .await?;

        let budget = state.config.scheduler.publish_timeout();
        tokio::time::timeout(budget, publisher.publish(content, &credential))
            .await
            .map_err(|_| Self::timed_out(content.platform, budget))?
    }

    async fn check(state: &AppState, content: &Content, container_id: &str) -> Result<PollOutcome, AppError> {
        let publisher = Self::publisher(state, content.platform)?;
        let credential = state
            .credentials
            .refresh_if_expired(content.owner_id, content.platform)
            .await?;

        let budget = state.config.scheduler.publish_timeout();
        tokio::time::timeout(budget, publisher.poll(content, container_id, &credential))
            .await
            .map_err(|_| Self::timed_out(content.platform, budget))?
    }

    async fn complete(
        state: &AppState,
        content: &Content,
        published: &PublishedRef,
        source: &str,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        state.content.mark_published(content.id, published, now).await?;
        state
            .jobs
            .upsert_latest(NewPublishJob::completed(content, &published.post_id, source, now))
            .await?;

        info!(
            content_id = %content.id,
            platform = %content.platform,
            post_id = %published.post_id,
            "✅ Content published"
        );
        Ok(())
    }

    async fn fail(state: &AppState, content: &Content, message: &str, source: &str, now: OffsetDateTime) -> Result<(), AppError> {
        warn!(content_id = %content.id, platform = %content.platform, error = message, "❌ Publish failed");

        state.content.mark_failed(content.id, message, now).await?;
        state
            .jobs
            .upsert_latest(NewPublishJob::failed(content, message, source, now))
            .await?;
        Ok(())
    }

    /// Fails `processing` items whose claim outlived the publish budget,
    /// e.g. after a crash mid-upload. Errors are logged and the run goes on.
    async fn fail_stale_claims(state: &AppState, as_of: OffsetDateTime, source: &str) -> usize {
        let budget = state.config.scheduler.publish_timeout();
        // A trigger time ahead of the clock must not expire live claims.
        let cutoff = as_of.min(OffsetDateTime::now_utc()) - time::Duration::seconds(budget.as_secs() as i64);

        let stale = match state.content.find_stale(cutoff, state.config.scheduler.batch_size).await {
            Ok(stale) => stale,
            Err(e) => {
                warn!(error = %e, "Failed to look up abandoned claims");
                return 0;
            }
        };

        let mut failed = 0;
        for content in &stale {
            let message = format!(
                "{} publish did not finish within {}s",
                content.platform.display_name(),
                budget.as_secs()
            );
            match state.content.fail_stale(content.id, content.updated_at, &message, as_of).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(content_id = %content.id, error = %e, "Failed to release abandoned claim");
                    continue;
                }
            }

            warn!(content_id = %content.id, platform = %content.platform, "❌ Abandoned claim marked failed");
            failed += 1;
            if let Err(e) = state
                .jobs
                .upsert_latest(NewPublishJob::failed(content, &message, source, as_of))
                .await
            {
                warn!(content_id = %content.id, error = %e, "Failed to record abandoned claim");
            }
        }
        failed
    }

    async fn prune_ledger(state: &AppState) {
        match state.jobs.prune_terminal(state.config.scheduler.job_retention).await {
            Ok(0) => {}
            Ok(deleted) => info!(deleted, "🧹 Pruned publish job history"),
            Err(e) => warn!(error = %e, "Publish job cleanup failed"),
        }
    }
}
