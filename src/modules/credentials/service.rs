use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use super::model::{PlatformCredential, TokenGrant};
use crate::common::error::AppError;
use crate::modules::content::model::Platform;

pub const YOUTUBE_REFRESH_FAILED: &str = "YouTube token expired and refresh failed";
pub const INSTAGRAM_TOKEN_EXPIRED: &str = "Instagram token expired, reconnect the account";

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError>;
}

pub enum Renewal {
    Fresh(PlatformCredential),
    Refreshed(PlatformCredential),
}

pub fn not_connected(platform: Platform) -> AppError {
    AppError::Credential(format!("{} account not connected", platform.display_name()))
}

/// Returns a usable credential, refreshing it through `refresher` when the
/// stored access token is expired. Callers persist `Renewal::Refreshed`.
pub async fn renew_if_expired(
    credential: PlatformCredential,
    now: OffsetDateTime,
    refresher: &dyn TokenRefresher,
) -> Result<Renewal, AppError> {
    if !credential.is_expired(now) {
        return Ok(Renewal::Fresh(credential));
    }

    match credential.platform {
        Platform::Instagram => Err(AppError::Credential(INSTAGRAM_TOKEN_EXPIRED.to_string())),
        Platform::Youtube => {
            let Some(refresh_token) = credential.refresh_token.as_deref() else {
                warn!(user_id = %credential.user_id, "YouTube token expired and no refresh token is stored");
                return Err(AppError::Credential(YOUTUBE_REFRESH_FAILED.to_string()));
            };

            let grant = refresher.refresh_token(refresh_token).await.map_err(|e| {
                warn!(user_id = %credential.user_id, error = %e, "YouTube token refresh failed");
                AppError::Credential(YOUTUBE_REFRESH_FAILED.to_string())
            })?;

            info!(user_id = %credential.user_id, "🔑 Refreshed YouTube access token");

            Ok(Renewal::Refreshed(PlatformCredential {
                access_token: grant.access_token,
                expires_at: Some(now + Duration::seconds(grant.expires_in)),
                ..credential
            }))
        }
    }
}
