use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{JobMetadata, JobResult, NewPublishJob, PublishJob, PublishJobStatus};
use crate::common::error::AppError;
use crate::modules::content::model::Platform;

pub type Result<T> = std::result::Result<T, AppError>;

/// Append/update log of publish attempts.
#[async_trait]
pub trait JobLedger: Send + Sync {
    /// Appends a new attempt row.
    async fn insert(&self, job: NewPublishJob) -> Result<PublishJob>;

    /// Overwrites the newest row for `(content_id, platform)` or appends one
    /// when the pair has no history yet.
    async fn upsert_latest(&self, job: NewPublishJob) -> Result<PublishJob>;

    async fn list_for_content(&self, content_id: Uuid) -> Result<Vec<PublishJob>>;

    /// Deletes terminal rows beyond the newest `keep`, oldest first.
    /// `pending`/`processing` rows are never touched.
    async fn prune_terminal(&self, keep: i64) -> Result<u64>;
}

#[derive(Debug, FromRow)]
struct PublishJobRow {
    id: Uuid,
    content_id: Uuid,
    owner_id: Uuid,
    platform: Platform,
    status: PublishJobStatus,
    scheduled_at: OffsetDateTime,
    completed_at: Option<OffsetDateTime>,
    result: Option<Json<JobResult>>,
    metadata: Json<JobMetadata>,
    source: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PublishJobRow> for PublishJob {
    fn from(row: PublishJobRow) -> Self {
        PublishJob {
            id: row.id,
            content_id: row.content_id,
            owner_id: row.owner_id,
            platform: row.platform,
            status: row.status,
            scheduled_at: row.scheduled_at,
            completed_at: row.completed_at,
            result: row.result.map(|r| r.0),
            metadata: row.metadata.0,
            source: row.source,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PublishJobRepository {
    pool: PgPool,
}

impl PublishJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobLedger for PublishJobRepository {
    async fn insert(&self, job: NewPublishJob) -> Result<PublishJob> {
        let row = sqlx::query_as::<_, PublishJobRow>(
            r#"
            INSERT INTO publish_jobs (
                id, content_id, owner_id, platform, status, scheduled_at,
                completed_at, result, metadata, source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job.content_id)
        .bind(job.owner_id)
        .bind(job.platform)
        .bind(job.status)
        .bind(job.scheduled_at)
        .bind(job.completed_at)
        .bind(job.result.map(Json))
        .bind(Json(job.metadata))
        .bind(job.source)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn upsert_latest(&self, job: NewPublishJob) -> Result<PublishJob> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, PublishJobRow>(
            r#"
            WITH latest AS (
                SELECT id FROM publish_jobs
                WHERE content_id = $1 AND platform = $2
                ORDER BY created_at DESC
                LIMIT 1
                FOR UPDATE
            )
            UPDATE publish_jobs
            SET status = $3, completed_at = $4, result = $5, metadata = $6,
                source = $7, updated_at = NOW()
            WHERE id IN (SELECT id FROM latest)
            RETURNING *
            "#,
        )
        .bind(job.content_id)
        .bind(job.platform)
        .bind(job.status)
        .bind(job.completed_at)
        .bind(job.result.clone().map(Json))
        .bind(Json(job.metadata.clone()))
        .bind(&job.source)
        .fetch_optional(&mut *tx)
        .await?;

        let row = match updated {
            Some(row) => row,
            None => {
                sqlx::query_as::<_, PublishJobRow>(
                    r#"
                    INSERT INTO publish_jobs (
                        id, content_id, owner_id, platform, status, scheduled_at,
                        completed_at, result, metadata, source
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    RETURNING *
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(job.content_id)
                .bind(job.owner_id)
                .bind(job.platform)
                .bind(job.status)
                .bind(job.scheduled_at)
                .bind(job.completed_at)
                .bind(job.result.map(Json))
                .bind(Json(job.metadata))
                .bind(job.source)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(row.into())
    }

    async fn list_for_content(&self, content_id: Uuid) -> Result<Vec<PublishJob>> {
        let rows = sqlx::query_as::<_, PublishJobRow>(
            "SELECT * FROM publish_jobs WHERE content_id = $1 ORDER BY created_at DESC",
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PublishJob::from).collect())
    }

    async fn prune_terminal(&self, keep: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM publish_jobs
            WHERE id IN (
                SELECT id FROM publish_jobs
                WHERE status IN ('completed', 'failed')
                ORDER BY created_at DESC
                OFFSET $1
            )
            "#,
        )
        .bind(keep.max(0))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
