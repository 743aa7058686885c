use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Content, ContentOptions, ContentStatus, Platform};
use crate::common::error::AppError;
use crate::infrastructure::platforms::PublishedRef;

pub type Result<T> = std::result::Result<T, AppError>;

/// Persistence for content items. Every status change is a conditional
/// update so concurrent dispatcher runs cannot both claim the same item.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn insert(&self, content: &Content) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Content>>;

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Content>>;

    /// `scheduled` items with `scheduled_at <= cutoff`, oldest first.
    async fn find_due(&self, cutoff: OffsetDateTime, limit: i64) -> Result<Vec<Content>>;

    /// Compare-and-swap on status. Returns `false` when the item was no
    /// longer in `from`.
    async fn transition(&self, id: Uuid, from: ContentStatus, to: ContentStatus, now: OffsetDateTime) -> Result<bool>;

    async fn mark_published(&self, id: Uuid, published: &PublishedRef, now: OffsetDateTime) -> Result<()>;

    async fn mark_failed(&self, id: Uuid, error: &str, now: OffsetDateTime) -> Result<()>;

    async fn mark_pending_poll(
        &self,
        id: Uuid,
        container_id: &str,
        next_poll_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<()>;

    /// `processing_pending_poll` items whose next check is due.
    async fn find_pollable(&self, now: OffsetDateTime, limit: i64) -> Result<Vec<Content>>;

    /// Leases a pollable item by moving `next_poll_at` from the value read
    /// (`seen_next_poll_at`) to `lease_until`. Fails when another run leased
    /// it or recorded an attempt in between.
    async fn lease_poll(
        &self,
        id: Uuid,
        seen_attempts: i32,
        seen_next_poll_at: OffsetDateTime,
        lease_until: OffsetDateTime,
    ) -> Result<bool>;

    async fn record_poll_attempt(
        &self,
        id: Uuid,
        attempts: i32,
        next_poll_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<()>;

    /// `processing` items untouched since before `cutoff`, oldest first.
    async fn find_stale(&self, cutoff: OffsetDateTime, limit: i64) -> Result<Vec<Content>>;

    /// Fails a stale `processing` item, provided it was not updated since
    /// it was read.
    async fn fail_stale(&self, id: Uuid, seen_updated_at: OffsetDateTime, error: &str, now: OffsetDateTime) -> Result<bool>;
}

#[derive(Debug, FromRow)]
struct ContentRow {
    id: Uuid,
    owner_id: Uuid,
    platform: Platform,
    title: Option<String>,
    caption: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    media_key: Option<String>,
    media_url: Option<String>,
    thumbnail_key: Option<String>,
    options: Json<ContentOptions>,
    status: ContentStatus,
    scheduled_at: Option<OffsetDateTime>,
    remote_container_id: Option<String>,
    poll_attempts: i32,
    next_poll_at: Option<OffsetDateTime>,
    published_at: Option<OffsetDateTime>,
    published_post_id: Option<String>,
    published_url: Option<String>,
    error: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ContentRow> for Content {
    fn from(row: ContentRow) -> Self {
        Content {
            id: row.id,
            owner_id: row.owner_id,
            platform: row.platform,
            title: row.title,
            caption: row.caption,
            description: row.description,
            tags: row.tags,
            media_key: row.media_key,
            media_url: row.media_url,
            thumbnail_key: row.thumbnail_key,
            options: row.options.0,
            status: row.status,
            scheduled_at: row.scheduled_at,
            remote_container_id: row.remote_container_id,
            poll_attempts: row.poll_attempts,
            next_poll_at: row.next_poll_at,
            published_at: row.published_at,
            published_post_id: row.published_post_id,
            published_url: row.published_url,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for ContentRepository {
    async fn insert(&self, content: &Content) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contents (
                id, owner_id, platform, title, caption, description, tags,
                media_key, media_url, thumbnail_key, options, status, scheduled_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(content.id)
        .bind(content.owner_id)
        .bind(content.platform)
        .bind(&content.title)
        .bind(&content.caption)
        .bind(&content.description)
        .bind(&content.tags)
        .bind(&content.media_key)
        .bind(&content.media_url)
        .bind(&content.thumbnail_key)
        .bind(Json(&content.options))
        .bind(content.status)
        .bind(content.scheduled_at)
        .bind(content.created_at)
        .bind(content.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Content>> {
        let row = sqlx::query_as::<_, ContentRow>("SELECT * FROM contents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Content::from))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            "SELECT * FROM contents WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Content::from).collect())
    }

    async fn find_due(&self, cutoff: OffsetDateTime, limit: i64) -> Result<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM contents
            WHERE status = 'scheduled' AND scheduled_at <= $1
            ORDER BY scheduled_at ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Content::from).collect())
    }

    async fn transition(&self, id: Uuid, from: ContentStatus, to: ContentStatus, now: OffsetDateTime) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contents
            SET status = $1, error = NULL, updated_at = $2
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(to)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_published(&self, id: Uuid, published: &PublishedRef, now: OffsetDateTime) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE contents
            SET status = 'published', published_at = $1, published_post_id = $2,
                published_url = $3, next_poll_at = NULL, error = NULL, updated_at = $1
            WHERE id = $4 AND status IN ('processing', 'processing_pending_poll')
            "#,
        )
        .bind(now)
        .bind(&published.post_id)
        .bind(&published.url)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str, now: OffsetDateTime) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE contents
            SET status = 'failed', error = $1, next_poll_at = NULL, updated_at = $2
            WHERE id = $3 AND status IN ('processing', 'processing_pending_poll')
            "#,
        )
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_pending_poll(
        &self,
        id: Uuid,
        container_id: &str,
        next_poll_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE contents
            SET status = 'processing_pending_poll', remote_container_id = $1,
                poll_attempts = 0, next_poll_at = $2, updated_at = $3
            WHERE id = $4 AND status = 'processing'
            "#,
        )
        .bind(container_id)
        .bind(next_poll_at)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_pollable(&self, now: OffsetDateTime, limit: i64) -> Result<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM contents
            WHERE status = 'processing_pending_poll' AND next_poll_at <= $1
            ORDER BY next_poll_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Content::from).collect())
    }

    async fn lease_poll(
        &self,
        id: Uuid,
        seen_attempts: i32,
        seen_next_poll_at: OffsetDateTime,
        lease_until: OffsetDateTime,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contents
            SET next_poll_at = $1
            WHERE id = $2 AND status = 'processing_pending_poll'
              AND poll_attempts = $3 AND next_poll_at = $4
            "#,
        )
        .bind(lease_until)
        .bind(id)
        .bind(seen_attempts)
        .bind(seen_next_poll_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_poll_attempt(
        &self,
        id: Uuid,
        attempts: i32,
        next_poll_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE contents
            SET poll_attempts = $1, next_poll_at = $2, updated_at = $3
            WHERE id = $4 AND status = 'processing_pending_poll'
            "#,
        )
        .bind(attempts)
        .bind(next_poll_at)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_stale(&self, cutoff: OffsetDateTime, limit: i64) -> Result<Vec<Content>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM contents
            WHERE status = 'processing' AND updated_at < $1
            ORDER BY updated_at ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Content::from).collect())
    }

    async fn fail_stale(&self, id: Uuid, seen_updated_at: OffsetDateTime, error: &str, now: OffsetDateTime) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contents
            SET status = 'failed', error = $1, updated_at = $2
            WHERE id = $3 AND status = 'processing' AND updated_at = $4
            "#,
        )
        .bind(error)
        .bind(now)
        .bind(id)
        .bind(seen_updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
