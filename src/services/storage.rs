//! Artifact storage for rendered reports.
//!
//! Production uses S3 (MinIO in development); the in-memory store serves
//! tests and S3-less local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

/// Byte storage addressed by key.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous object.
    async fn save(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()>;

    /// Read an object. Missing keys are [`AppError::NotFound`].
    async fn read(&self, key: &str) -> AppResult<Vec<u8>>;

    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// Build the key of a report artifact.
///
/// Format: `private/reports/{company_id}/{report_id}/{filename}`
pub fn report_key(company_id: Uuid, report_id: Uuid, filename: &str) -> String {
    format!("private/reports/{}/{}/{}", company_id, report_id, filename)
}

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3 storage client from configuration.
    pub async fn new(config: &StorageSettings) -> AppResult<Self> {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "ctr");

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let storage = Self {
            client,
            bucket: config.bucket.clone(),
        };

        storage.ensure_bucket_exists().await?;

        info!("S3 storage initialized: bucket={}", config.bucket);

        Ok(storage)
    }

    /// Ensure the bucket exists, creating it if necessary.
    async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    info!("Creating S3 bucket '{}'", self.bucket);
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| {
                            AppError::Storage(format!("Failed to create bucket: {}", e))
                        })?;
                    Ok(())
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl ArtifactStore for S3Storage {
    async fn save(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from(data);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload file to S3: {}", e)))?;

        Ok(())
    }

    async fn read(&self, key: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    AppError::NotFound(format!("File {}", key))
                } else {
                    AppError::Storage(format!("Failed to get file from S3: {}", service_error))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete file from S3: {}", e)))?;

        Ok(())
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded for `key`.
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().await.get(key).map(|(_, ct)| ct.clone())
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ArtifactStore for MemoryStorage {
    async fn save(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn read(&self, key: &str) -> AppResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| AppError::NotFound(format!("File {}", key)))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_key() {
        let company = Uuid::nil();
        let report = Uuid::now_v7();
        assert_eq!(
            report_key(company, report, "acme_x_captable.pdf"),
            format!("private/reports/{}/{}/acme_x_captable.pdf", company, report)
        );
    }

    #[tokio::test]
    async fn test_memory_storage_overwrites() {
        let store = MemoryStorage::new();
        store.save("a", b"one".to_vec(), "text/plain").await.unwrap();
        store.save("a", b"two".to_vec(), "application/pdf").await.unwrap();

        assert_eq!(store.read("a").await.unwrap(), b"two");
        assert_eq!(store.content_type("a").await.as_deref(), Some("application/pdf"));

        store.delete("a").await.unwrap();
        assert!(matches!(store.read("a").await, Err(AppError::NotFound(_))));
    }
}
