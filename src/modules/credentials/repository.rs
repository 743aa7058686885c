use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::PlatformCredential;
use super::service::{self, Renewal, TokenRefresher};
use crate::common::error::AppError;
use crate::modules::content::model::Platform;

/// Owner of the stored OAuth tokens.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns a valid credential for `(user_id, platform)`, refreshing and
    /// persisting it first when expired. Expiry is judged against the wall
    /// clock. Concurrent callers for the same pair observe a single refresh.
    async fn refresh_if_expired(&self, user_id: Uuid, platform: Platform) -> Result<PlatformCredential, AppError>;
}

#[derive(Clone)]
pub struct CredentialRepository {
    pool: PgPool,
    refresher: Arc<dyn TokenRefresher>,
}

impl CredentialRepository {
    pub fn new(pool: PgPool, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self { pool, refresher }
    }
}

#[async_trait]
impl CredentialStore for CredentialRepository {
    async fn refresh_if_expired(&self, user_id: Uuid, platform: Platform) -> Result<PlatformCredential, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes refreshes for the same account.
        let stored = sqlx::query_as::<_, PlatformCredential>(
            r#"
            SELECT user_id, platform, account_id, access_token, refresh_token, expires_at
            FROM platform_credentials
            WHERE user_id = $1 AND platform = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(platform)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| service::not_connected(platform))?;

        let credential = match service::renew_if_expired(stored, OffsetDateTime::now_utc(), self.refresher.as_ref()).await? {
            Renewal::Fresh(credential) => credential,
            Renewal::Refreshed(credential) => {
                sqlx::query(
                    r#"
                    UPDATE platform_credentials
                    SET access_token = $1, expires_at = $2, updated_at = NOW()
                    WHERE user_id = $3 AND platform = $4
                    "#,
                )
                .bind(&credential.access_token)
                .bind(credential.expires_at)
                .bind(user_id)
                .bind(platform)
                .execute(&mut *tx)
                .await?;
                credential
            }
        };

        tx.commit().await?;
        Ok(credential)
    }
}
