use serde::Deserialize;
use std::time::Duration;
use crate::config::env::{self, EnvKey};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub minio_url: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub media_public_url: String,
    pub jwt_secret: String,
    pub cron_secret: String,
    pub scheduler: SchedulerSettings,
    pub platforms: PlatformSettings,
}

/// Knobs for the dispatcher, the Instagram poller and ledger retention.
#[derive(Clone, Debug, Deserialize)]
pub struct SchedulerSettings {
    pub batch_size: i64,
    pub lookahead_secs: i64,
    pub job_retention: i64,
    pub poll_max_attempts: i32,
    pub poll_base_delay_secs: u64,
    pub poll_max_delay_secs: u64,
    pub publish_timeout_secs: u64,
    /// Cron expressions for the embedded trigger worker. `None` leaves
    /// triggering to the external caller.
    pub publish_cron: Option<String>,
    pub poll_cron: Option<String>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            lookahead_secs: 60,
            job_retention: 1000,
            poll_max_attempts: 10,
            poll_base_delay_secs: 15,
            poll_max_delay_secs: 90,
            publish_timeout_secs: 900,
            publish_cron: None,
            poll_cron: None,
        }
    }
}

impl SchedulerSettings {
    pub fn lookahead(&self) -> time::Duration {
        time::Duration::seconds(self.lookahead_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    /// Delay before the next container check after `attempt` checks.
    pub fn poll_delay(&self, attempt: i32) -> time::Duration {
        let attempt = attempt.max(1) as u32;
        let exponential = self
            .poll_base_delay_secs
            .saturating_mul(2u64.saturating_pow(attempt - 1));
        time::Duration::seconds(exponential.min(self.poll_max_delay_secs) as i64)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlatformSettings {
    pub instagram_graph_url: String,
    pub youtube_upload_url: String,
    pub google_token_url: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub http_timeout_secs: u64,
    pub upload_timeout_secs: u64,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            instagram_graph_url: "https://graph.facebook.com/v21.0".to_string(),
            youtube_upload_url: "https://www.googleapis.com/upload/youtube/v3".to_string(),
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            http_timeout_secs: 30,
            upload_timeout_secs: 600,
        }
    }
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        let defaults = SchedulerSettings::default();
        let scheduler = SchedulerSettings {
            batch_size: env::get_parsed(EnvKey::DispatchBatchSize, defaults.batch_size),
            lookahead_secs: env::get_parsed(EnvKey::DispatchLookaheadSecs, defaults.lookahead_secs),
            job_retention: env::get_parsed(EnvKey::JobRetention, defaults.job_retention),
            poll_max_attempts: env::get_parsed(EnvKey::PollMaxAttempts, defaults.poll_max_attempts),
            poll_base_delay_secs: env::get_parsed(EnvKey::PollBaseDelaySecs, defaults.poll_base_delay_secs),
            poll_max_delay_secs: env::get_parsed(EnvKey::PollMaxDelaySecs, defaults.poll_max_delay_secs),
            publish_timeout_secs: env::get_parsed(EnvKey::PublishTimeoutSecs, defaults.publish_timeout_secs),
            publish_cron: env::get_opt(EnvKey::PublishCron),
            poll_cron: env::get_opt(EnvKey::PollCron),
        };

        let platform_defaults = PlatformSettings::default();
        let platforms = PlatformSettings {
            instagram_graph_url: env::get_or(EnvKey::InstagramGraphUrl, &platform_defaults.instagram_graph_url),
            youtube_upload_url: env::get_or(EnvKey::YoutubeUploadUrl, &platform_defaults.youtube_upload_url),
            google_token_url: env::get_or(EnvKey::GoogleTokenUrl, &platform_defaults.google_token_url),
            google_client_id: env::get(EnvKey::GoogleClientId)?,
            google_client_secret: env::get(EnvKey::GoogleClientSecret)?,
            http_timeout_secs: env::get_parsed(EnvKey::HttpTimeoutSecs, platform_defaults.http_timeout_secs),
            upload_timeout_secs: env::get_parsed(EnvKey::UploadTimeoutSecs, platform_defaults.upload_timeout_secs),
        };

        let minio_url = env::get(EnvKey::MinioUrl)?;
        let minio_bucket = env::get(EnvKey::MinioBucket)?;
        let media_public_url = env::get_or(
            EnvKey::MediaPublicUrl,
            &format!("{}/{}", minio_url.trim_end_matches('/'), minio_bucket),
        );

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            database_url: env::get(EnvKey::DatabaseUrl)?,
            minio_url,
            minio_bucket,
            minio_access_key: env::get(EnvKey::MinioAccessKey)?,
            minio_secret_key: env::get(EnvKey::MinioSecretKey)?,
            media_public_url,
            jwt_secret: env::get(EnvKey::JwtSecret)?,
            cron_secret: env::get(EnvKey::CronSecret)?,
            scheduler,
            platforms,
        })
    }
}
