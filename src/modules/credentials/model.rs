use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::modules::content::model::Platform;

/// Tokens are treated as expired this long before their recorded expiry.
pub const EXPIRY_SKEW: Duration = Duration::seconds(60);

#[derive(Clone, FromRow)]
pub struct PlatformCredential {
    pub user_id: Uuid,
    pub platform: Platform,
    /// Instagram business account id or YouTube channel id.
    pub account_id: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

impl PlatformCredential {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at
            .map(|expires_at| expires_at <= now + EXPIRY_SKEW)
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for PlatformCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCredential")
            .field("user_id", &self.user_id)
            .field("platform", &self.platform)
            .field("account_id", &self.account_id)
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of an OAuth refresh-token grant.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: i64,
}
