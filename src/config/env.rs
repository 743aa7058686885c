use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    MediaPublicUrl,
    JwtSecret,
    CronSecret,
    DispatchBatchSize,
    DispatchLookaheadSecs,
    JobRetention,
    PollMaxAttempts,
    PollBaseDelaySecs,
    PollMaxDelaySecs,
    PublishTimeoutSecs,
    PublishCron,
    PollCron,
    InstagramGraphUrl,
    YoutubeUploadUrl,
    GoogleTokenUrl,
    GoogleClientId,
    GoogleClientSecret,
    HttpTimeoutSecs,
    UploadTimeoutSecs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET_MEDIA",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::MediaPublicUrl => "MEDIA_PUBLIC_URL",
            EnvKey::JwtSecret => "JWT_SECRET",
            EnvKey::CronSecret => "CRON_SECRET",
            EnvKey::DispatchBatchSize => "DISPATCH_BATCH_SIZE",
            EnvKey::DispatchLookaheadSecs => "DISPATCH_LOOKAHEAD_SECS",
            EnvKey::JobRetention => "PUBLISH_JOB_RETENTION",
            EnvKey::PollMaxAttempts => "POLL_MAX_ATTEMPTS",
            EnvKey::PollBaseDelaySecs => "POLL_BASE_DELAY_SECS",
            EnvKey::PollMaxDelaySecs => "POLL_MAX_DELAY_SECS",
            EnvKey::PublishTimeoutSecs => "PUBLISH_TIMEOUT_SECS",
            EnvKey::PublishCron => "PUBLISH_CRON",
            EnvKey::PollCron => "POLL_CRON",
            EnvKey::InstagramGraphUrl => "INSTAGRAM_GRAPH_URL",
            EnvKey::YoutubeUploadUrl => "YOUTUBE_UPLOAD_URL",
            EnvKey::GoogleTokenUrl => "GOOGLE_TOKEN_URL",
            EnvKey::GoogleClientId => "GOOGLE_CLIENT_ID",
            EnvKey::GoogleClientSecret => "GOOGLE_CLIENT_SECRET",
            EnvKey::HttpTimeoutSecs => "HTTP_TIMEOUT_SECS",
            EnvKey::UploadTimeoutSecs => "UPLOAD_TIMEOUT_SECS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
