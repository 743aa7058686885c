use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::platforms::PublisherRegistry;
use crate::infrastructure::storage::s3::MediaStorage;
use crate::modules::content::repository::ContentStore;
use crate::modules::credentials::repository::CredentialStore;
use crate::modules::publish_job::repository::JobLedger;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub content: Arc<dyn ContentStore>,
    pub jobs: Arc<dyn JobLedger>,
    pub credentials: Arc<dyn CredentialStore>,
    pub media: Arc<dyn MediaStorage>,
    pub publishers: PublisherRegistry,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        content: Arc<dyn ContentStore>,
        jobs: Arc<dyn JobLedger>,
        credentials: Arc<dyn CredentialStore>,
        media: Arc<dyn MediaStorage>,
        publishers: PublisherRegistry,
    ) -> Self {
        Self {
            config,
            content,
            jobs,
            credentials,
            media,
            publishers,
        }
    }
}
