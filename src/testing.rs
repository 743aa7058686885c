//! In-memory stand-ins for the Postgres stores, the object store and the
//! platform adapters. They honour the same conditional-update rules as the
//! SQL in the repositories.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::settings::{AppConfig, PlatformSettings, SchedulerSettings};
use crate::infrastructure::platforms::{
    PlatformPublisher, PollOutcome, PublishOutcome, PublishedRef, PublisherRegistry,
};
use crate::infrastructure::storage::s3::MediaStorage;
use crate::modules::content::model::{Content, ContentStatus, NewContent, Platform};
use crate::modules::content::repository::ContentStore;
use crate::modules::credentials::model::{PlatformCredential, TokenGrant};
use crate::modules::credentials::repository::CredentialStore;
use crate::modules::credentials::service::{self, Renewal, TokenRefresher};
use crate::modules::publish_job::model::{NewPublishJob, PublishJob};
use crate::modules::publish_job::repository::JobLedger;
use crate::state::AppState;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_CRON_SECRET: &str = "test-cron-secret";

fn unavailable() -> AppError {
    AppError::Internal(anyhow::anyhow!("database unavailable"))
}

// --- Content ---

#[derive(Default)]
pub struct MemoryContentStore {
    items: Mutex<HashMap<Uuid, Content>>,
    down: AtomicBool,
}

impl MemoryContentStore {
    pub fn seed(&self, content: Content) -> Content {
        self.items.lock().unwrap().insert(content.id, content.clone());
        content
    }

    pub fn snapshot(&self, id: Uuid) -> Content {
        self.items.lock().unwrap().get(&id).cloned().expect("content exists")
    }

    pub fn set_unavailable(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.down.load(Ordering::SeqCst) { Err(unavailable()) } else { Ok(()) }
    }

    fn update<F: FnOnce(&mut Content)>(&self, id: Uuid, guard: impl Fn(&Content) -> bool, f: F) -> bool {
        let mut items = self.items.lock().unwrap();
        match items.get_mut(&id) {
            Some(content) if guard(content) => {
                f(content);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn insert(&self, content: &Content) -> Result<(), AppError> {
        self.check()?;
        self.seed(content.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Content>, AppError> {
        self.check()?;
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Content>, AppError> {
        self.check()?;
        let mut items: Vec<Content> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn find_due(&self, cutoff: OffsetDateTime, limit: i64) -> Result<Vec<Content>, AppError> {
        self.check()?;
        let mut due: Vec<Content> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == ContentStatus::Scheduled && c.scheduled_at.is_some_and(|at| at <= cutoff))
            .cloned()
            .collect();
        due.sort_by_key(|c| c.scheduled_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn transition(&self, id: Uuid, from: ContentStatus, to: ContentStatus, now: OffsetDateTime) -> Result<bool, AppError> {
        self.check()?;
        Ok(self.update(id, |c| c.status == from, |c| {
            c.status = to;
            c.error = None;
            c.updated_at = now;
        }))
    }

    async fn mark_published(&self, id: Uuid, published: &PublishedRef, now: OffsetDateTime) -> Result<(), AppError> {
        self.check()?;
        self.update(id, |c| c.status.is_processing(), |c| {
            c.status = ContentStatus::Published;
            c.published_at = Some(now);
            c.published_post_id = Some(published.post_id.clone());
            c.published_url = published.url.clone();
            c.next_poll_at = None;
            c.error = None;
            c.updated_at = now;
        });
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str, now: OffsetDateTime) -> Result<(), AppError> {
        self.check()?;
        self.update(id, |c| c.status.is_processing(), |c| {
            c.status = ContentStatus::Failed;
            c.error = Some(error.to_string());
            c.next_poll_at = None;
            c.updated_at = now;
        });
        Ok(())
    }

    async fn mark_pending_poll(
        &self,
        id: Uuid,
        container_id: &str,
        next_poll_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        self.check()?;
        self.update(id, |c| c.status == ContentStatus::Processing, |c| {
            c.status = ContentStatus::ProcessingPendingPoll;
            c.remote_container_id = Some(container_id.to_string());
            c.poll_attempts = 0;
            c.next_poll_at = Some(next_poll_at);
            c.updated_at = now;
        });
        Ok(())
    }

    async fn find_pollable(&self, now: OffsetDateTime, limit: i64) -> Result<Vec<Content>, AppError> {
        self.check()?;
        let mut pollable: Vec<Content> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                c.status == ContentStatus::ProcessingPendingPoll && c.next_poll_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        pollable.sort_by_key(|c| c.next_poll_at);
        pollable.truncate(limit.max(0) as usize);
        Ok(pollable)
    }

    async fn lease_poll(
        &self,
        id: Uuid,
        seen_attempts: i32,
        seen_next_poll_at: OffsetDateTime,
        lease_until: OffsetDateTime,
    ) -> Result<bool, AppError> {
        self.check()?;
        Ok(self.update(
            id,
            |c| {
                c.status == ContentStatus::ProcessingPendingPoll
                    && c.poll_attempts == seen_attempts
                    && c.next_poll_at == Some(seen_next_poll_at)
            },
            |c| c.next_poll_at = Some(lease_until),
        ))
    }

    async fn record_poll_attempt(
        &self,
        id: Uuid,
        attempts: i32,
        next_poll_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<(), AppError> {
        self.check()?;
        self.update(id, |c| c.status == ContentStatus::ProcessingPendingPoll, |c| {
            c.poll_attempts = attempts;
            c.next_poll_at = Some(next_poll_at);
            c.updated_at = now;
        });
        Ok(())
    }

    async fn find_stale(&self, cutoff: OffsetDateTime, limit: i64) -> Result<Vec<Content>, AppError> {
        self.check()?;
        let mut stale: Vec<Content> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == ContentStatus::Processing && c.updated_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|c| c.updated_at);
        stale.truncate(limit.max(0) as usize);
        Ok(stale)
    }

    async fn fail_stale(
        &self,
        id: Uuid,
        seen_updated_at: OffsetDateTime,
        error: &str,
        now: OffsetDateTime,
    ) -> Result<bool, AppError> {
        self.check()?;
        Ok(self.update(
            id,
            |c| c.status == ContentStatus::Processing && c.updated_at == seen_updated_at,
            |c| {
                c.status = ContentStatus::Failed;
                c.error = Some(error.to_string());
                c.updated_at = now;
            },
        ))
    }
}

// --- Publish jobs ---

/// Rows are kept in creation order; the last matching row is the newest.
#[derive(Default)]
pub struct MemoryJobLedger {
    rows: Mutex<Vec<PublishJob>>,
    prune_broken: AtomicBool,
}

impl MemoryJobLedger {
    pub fn rows(&self) -> Vec<PublishJob> {
        self.rows.lock().unwrap().clone()
    }

    pub fn rows_for(&self, content_id: Uuid) -> Vec<PublishJob> {
        self.rows().into_iter().filter(|j| j.content_id == content_id).collect()
    }

    pub fn seed(&self, job: NewPublishJob) -> PublishJob {
        let job = job.into_job(Uuid::new_v4(), OffsetDateTime::now_utc());
        self.rows.lock().unwrap().push(job.clone());
        job
    }

    pub fn break_pruning(&self) {
        self.prune_broken.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobLedger for MemoryJobLedger {
    async fn insert(&self, job: NewPublishJob) -> Result<PublishJob, AppError> {
        Ok(self.seed(job))
    }

    async fn upsert_latest(&self, job: NewPublishJob) -> Result<PublishJob, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let latest = rows
            .iter_mut()
            .rev()
            .find(|row| row.content_id == job.content_id && row.platform == job.platform);

        match latest {
            Some(row) => {
                row.status = job.status;
                row.completed_at = job.completed_at;
                row.result = job.result;
                row.metadata = job.metadata;
                row.source = job.source;
                row.updated_at = OffsetDateTime::now_utc();
                Ok(row.clone())
            }
            None => {
                let row = job.into_job(Uuid::new_v4(), OffsetDateTime::now_utc());
                rows.push(row.clone());
                Ok(row)
            }
        }
    }

    async fn list_for_content(&self, content_id: Uuid) -> Result<Vec<PublishJob>, AppError> {
        let mut rows = self.rows_for(content_id);
        rows.reverse();
        Ok(rows)
    }

    async fn prune_terminal(&self, keep: i64) -> Result<u64, AppError> {
        if self.prune_broken.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut rows = self.rows.lock().unwrap();
        let keep = keep.max(0) as usize;
        let mut seen_terminal = 0;
        let mut doomed = Vec::new();
        for row in rows.iter().rev() {
            if row.status.is_terminal() {
                seen_terminal += 1;
                if seen_terminal > keep {
                    doomed.push(row.id);
                }
            }
        }
        rows.retain(|row| !doomed.contains(&row.id));
        Ok(doomed.len() as u64)
    }
}

// --- Credentials ---

pub struct StaticRefresher {
    grant: Option<TokenGrant>,
    calls: AtomicUsize,
}

impl StaticRefresher {
    pub fn failing() -> Self {
        Self { grant: None, calls: AtomicUsize::new(0) }
    }

    pub fn granting(access_token: &str, expires_in: i64) -> Self {
        Self {
            grant: Some(TokenGrant { access_token: access_token.to_string(), expires_in }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for StaticRefresher {
    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenGrant, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.grant
            .clone()
            .ok_or_else(|| AppError::Publish("invalid_grant".to_string()))
    }
}

pub struct MemoryCredentialStore {
    credentials: tokio::sync::Mutex<HashMap<(Uuid, Platform), PlatformCredential>>,
    refresher: Arc<dyn TokenRefresher>,
}

impl MemoryCredentialStore {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self { credentials: tokio::sync::Mutex::new(HashMap::new()), refresher }
    }

    pub async fn put(&self, credential: PlatformCredential) {
        self.credentials
            .lock()
            .await
            .insert((credential.user_id, credential.platform), credential);
    }

    pub async fn stored(&self, user_id: Uuid, platform: Platform) -> Option<PlatformCredential> {
        self.credentials.lock().await.get(&(user_id, platform)).cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn refresh_if_expired(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<PlatformCredential, AppError> {
        let mut credentials = self.credentials.lock().await;
        let stored = credentials
            .get(&(user_id, platform))
            .cloned()
            .ok_or_else(|| service::not_connected(platform))?;

        match service::renew_if_expired(stored, OffsetDateTime::now_utc(), self.refresher.as_ref()).await? {
            Renewal::Fresh(credential) => Ok(credential),
            Renewal::Refreshed(credential) => {
                credentials.insert((user_id, platform), credential.clone());
                Ok(credential)
            }
        }
    }
}

// --- Media ---

#[derive(Default)]
pub struct MemoryMedia {
    objects: Mutex<HashMap<String, Bytes>>,
    deletes_fail: AtomicBool,
}

impl MemoryMedia {
    pub fn with_object(key: &str, body: &[u8]) -> Self {
        let media = Self::default();
        media.put(key, body);
        media
    }

    pub fn put(&self, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::copy_from_slice(body));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn fail_deletes(&self) {
        self.deletes_fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaStorage for MemoryMedia {
    async fn store(&self, key: &str, body: Bytes, _content_type: &str) -> Result<String, AppError> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(self.public_url(key))
    }

    async fn fetch(&self, key: &str) -> Result<Bytes, AppError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("No such object: {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        if self.deletes_fail.load(Ordering::SeqCst) {
            return Err(AppError::StorageCleanup(format!("Failed to delete {}", key)));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://media.test/{}", key)
    }
}

// --- Platform adapters ---

/// Scripted adapter. Publishes succeed with `remote-<content id>` unless an
/// outcome or failure has been scripted.
#[derive(Default)]
pub struct FakePublisher {
    outcome: Mutex<Option<PublishOutcome>>,
    failure: Mutex<Option<String>>,
    failures: Mutex<HashMap<Uuid, String>>,
    hang: AtomicBool,
    polls: Mutex<VecDeque<Result<PollOutcome, String>>>,
    published: Mutex<Vec<Uuid>>,
    poll_calls: AtomicUsize,
}

impl FakePublisher {
    pub fn pending(&self, handle: &str) {
        *self.outcome.lock().unwrap() = Some(PublishOutcome::Pending { handle: handle.to_string() });
    }

    pub fn fail_all(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_for(&self, content_id: Uuid, message: &str) {
        self.failures.lock().unwrap().insert(content_id, message.to_string());
    }

    pub fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn script_polls(&self, outcomes: Vec<Result<PollOutcome, &str>>) {
        let mut polls = self.polls.lock().unwrap();
        polls.extend(outcomes.into_iter().map(|o| o.map_err(str::to_string)));
    }

    pub fn published_ids(&self) -> Vec<Uuid> {
        self.published.lock().unwrap().clone()
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformPublisher for FakePublisher {
    async fn publish(&self, content: &Content, _credential: &PlatformCredential) -> Result<PublishOutcome, AppError> {
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
        self.published.lock().unwrap().push(content.id);

        if let Some(message) = self.failures.lock().unwrap().get(&content.id) {
            return Err(AppError::Publish(message.clone()));
        }
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(AppError::Publish(message));
        }

        Ok(self.outcome.lock().unwrap().clone().unwrap_or_else(|| {
            PublishOutcome::Published(PublishedRef {
                post_id: format!("remote-{}", content.id),
                url: Some(format!("https://example.test/p/{}", content.id)),
            })
        }))
    }

    async fn poll(
        &self,
        _content: &Content,
        _handle: &str,
        _credential: &PlatformCredential,
    ) -> Result<PollOutcome, AppError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        match self.polls.lock().unwrap().pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(AppError::Publish(message)),
            None => Ok(PollOutcome::Processing),
        }
    }
}

// --- Wiring ---

pub fn test_config() -> AppConfig {
    AppConfig {
        server_port: 0,
        database_url: "postgres://localhost/test".to_string(),
        minio_url: "http://localhost:9000".to_string(),
        minio_bucket: "media".to_string(),
        minio_access_key: "minio".to_string(),
        minio_secret_key: "minio123".to_string(),
        media_public_url: "https://media.test".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        cron_secret: TEST_CRON_SECRET.to_string(),
        scheduler: SchedulerSettings::default(),
        platforms: PlatformSettings::default(),
    }
}

pub struct Harness {
    pub config: AppConfig,
    pub content: Arc<MemoryContentStore>,
    pub jobs: Arc<MemoryJobLedger>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub media: Arc<MemoryMedia>,
    pub refresher: Arc<StaticRefresher>,
    pub instagram: Arc<FakePublisher>,
    pub youtube: Arc<FakePublisher>,
    publishers: PublisherRegistry,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_refresher(StaticRefresher::granting("refreshed-token", 3600))
    }

    pub fn with_refresher(refresher: StaticRefresher) -> Self {
        let refresher = Arc::new(refresher);
        let instagram = Arc::new(FakePublisher::default());
        let youtube = Arc::new(FakePublisher::default());
        let publishers = PublisherRegistry::new()
            .with(Platform::Instagram, instagram.clone())
            .with(Platform::Youtube, youtube.clone());

        Self {
            config: test_config(),
            content: Arc::new(MemoryContentStore::default()),
            jobs: Arc::new(MemoryJobLedger::default()),
            credentials: Arc::new(MemoryCredentialStore::new(refresher.clone())),
            media: Arc::new(MemoryMedia::default()),
            refresher,
            instagram,
            youtube,
            publishers,
        }
    }

    /// Swaps the adapter used for `platform`.
    pub fn register(&mut self, platform: Platform, publisher: Arc<dyn PlatformPublisher>) {
        self.publishers = self.publishers.clone().with(platform, publisher);
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            self.config.clone(),
            self.content.clone(),
            self.jobs.clone(),
            self.credentials.clone(),
            self.media.clone(),
            self.publishers.clone(),
        )
    }

    pub async fn connect(&self, user_id: Uuid, platform: Platform, expires_at: Option<OffsetDateTime>) {
        self.credentials
            .put(PlatformCredential {
                user_id,
                platform,
                account_id: Some(format!("{}-account", platform)),
                access_token: "access-token".to_string(),
                refresh_token: Some("refresh-token".to_string()),
                expires_at,
            })
            .await;
    }

    /// Seeds a `scheduled` item with the fields its platform requires and
    /// the media blob it points at.
    pub fn seed_scheduled(&self, owner_id: Uuid, platform: Platform, scheduled_at: OffsetDateTime) -> Content {
        let media_key = format!("uploads/{}/{}.mp4", owner_id, Uuid::new_v4());
        self.media.put(&media_key, b"video");
        let new = NewContent {
            owner_id,
            title: Some("Launch video".to_string()),
            caption: Some("We are live".to_string()),
            media_key: Some(media_key),
            scheduled_at: Some(scheduled_at),
            ..Default::default()
        };
        self.content.seed(Content::from_new(new, platform, scheduled_at))
    }

    pub fn seed_with_status(&self, owner_id: Uuid, platform: Platform, status: ContentStatus) -> Content {
        let mut content = self.seed_scheduled(owner_id, platform, OffsetDateTime::now_utc());
        content.status = status;
        self.content.seed(content)
    }
}

pub fn bearer_token(user_id: Uuid) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = jsonwebtoken::get_current_timestamp() as usize;
    let claims = crate::middleware::auth::TokenClaims { sub: user_id, iat: now, exp: now + 900 };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()))
        .expect("encode test token");
    format!("Bearer {}", token)
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
