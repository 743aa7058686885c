use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};

/// Body of a trigger call. Both fields are optional; an empty body runs
/// against the current time with source `cron`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub current_time: Option<OffsetDateTime>,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ManualTriggerQuery {
    /// Shared trigger secret.
    pub secret: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub success: bool,
    pub processed_count: usize,
    pub error_count: usize,
    pub total_found: usize,
    /// `processing` items failed because their claim outlived the publish budget.
    pub stale_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub processed_at: OffsetDateTime,
    pub source: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub success: bool,
    pub checked_count: usize,
    pub published_count: usize,
    pub failed_count: usize,
    pub pending_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub processed_at: OffsetDateTime,
    pub source: String,
}
