use crate::modules::publish_job::model::source;
use crate::modules::scheduler::service::SchedulerService;
use crate::state::AppState;
use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
enum Task {
    Dispatch,
    Poll,
}

impl Task {
    fn name(&self) -> &'static str {
        match self {
            Task::Dispatch => "dispatch",
            Task::Poll => "instagram-poll",
        }
    }
}

/// Starts the in-process trigger loops for whichever cron expressions are
/// configured. Without any, triggering stays with the external caller.
pub fn start_publish_worker(state: AppState) {
    let settings = state.config.scheduler.clone();

    for (task, expression) in [(Task::Dispatch, settings.publish_cron), (Task::Poll, settings.poll_cron)] {
        let Some(expression) = expression else {
            continue;
        };

        match Schedule::from_str(&expression) {
            Ok(schedule) => {
                info!("⏰ Starting {} worker on '{}'", task.name(), expression);
                tokio::spawn(run_schedule(state.clone(), task, schedule));
            }
            Err(e) => error!("❌ Invalid cron expression '{}' for {}: {}", expression, task.name(), e),
        }
    }
}

async fn run_schedule(state: AppState, task: Task, schedule: Schedule) {
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            warn!("{} schedule has no upcoming runs, stopping", task.name());
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;

        let as_of = OffsetDateTime::now_utc();
        match task {
            Task::Dispatch => match SchedulerService::run_due(&state, as_of, source::WORKER).await {
                Ok(summary) => info!(
                    processed = summary.processed_count,
                    errors = summary.error_count,
                    found = summary.total_found,
                    "✅ Scheduled dispatch finished"
                ),
                Err(e) => error!("❌ Scheduled dispatch failed: {}", e),
            },
            Task::Poll => match SchedulerService::poll_pending(&state, as_of, source::WORKER).await {
                Ok(summary) => info!(
                    checked = summary.checked_count,
                    published = summary.published_count,
                    failed = summary.failed_count,
                    "✅ Scheduled container check finished"
                ),
                Err(e) => error!("❌ Scheduled container check failed: {}", e),
            },
        }
    }
}
