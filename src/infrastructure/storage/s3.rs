use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use bytes::Bytes;
use tracing::info;

use crate::common::error::AppError;

/// Object-store capability used by uploads and the publish adapters.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Stores `body` under `key` and returns its public URL.
    async fn store(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError>;

    async fn fetch(&self, key: &str) -> Result<Bytes, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    fn public_url(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
    pub public_base: String,
}

impl StorageService {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        public_base: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ Connected to S3 (MinIO)");

        Self {
            client,
            bucket: bucket.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStorage for StorageService {
    async fn store(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to store {}: {}", key, DisplayErrorContext(&e))))?;

        Ok(self.public_url(key))
    }

    async fn fetch(&self, key: &str) -> Result<Bytes, AppError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to fetch {}: {}", key, DisplayErrorContext(&e))))?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read {}: {}", key, e)))?;

        Ok(data.into_bytes())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::StorageCleanup(format!("Failed to delete {}: {}", key, DisplayErrorContext(&e)))
            })?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key.trim_start_matches('/'))
    }
}
