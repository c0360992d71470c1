//! Storage layer for inference request templates
//!
//! Templates are provisioned as JSON objects in a bucket. They are read either
//! from the function runtime's bucket mount or over the S3-compatible API.

use crate::config::{InferenceSettings, TEMPLATE_CACHE_TTL_SECS};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use moka::future::Cache;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error retrieving object from S3
    #[error("S3 Get error: {0}")]
    S3Get(Box<SdkError<GetObjectError>>),
    /// Object does not exist
    #[error("Template not found: {0}")]
    NotFound(String),
    /// Error during JSON deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration error (missing bucket, credentials, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Source of provisioned request templates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Load and parse the JSON template stored under `key`
    async fn load_template(&self, key: &str) -> Result<Value, StorageError>;
    /// Check that the backing storage is reachable
    async fn check_connection(&self) -> Result<(), String>;
}

/// Templates read from the bucket mount of the function runtime
pub struct MountedStorage {
    root: PathBuf,
}

impl MountedStorage {
    /// Create storage rooted at `{mount_path}/{bucket}`
    #[must_use]
    pub fn new(mount_path: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            root: mount_path.into().join(bucket),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() || key.split('/').any(|part| part == "..") {
            return Err(StorageError::Config(format!("invalid object key: {key:?}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl TemplateStore for MountedStorage {
    async fn load_template(&self, key: &str) -> Result<Value, StorageError> {
        let path = self.object_path(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    async fn check_connection(&self) -> Result<(), String> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {
                info!("Bucket mount available at {}", self.root.display());
                Ok(())
            }
            Ok(_) => Err(format!("{} is not a directory", self.root.display())),
            Err(e) => {
                error!("Bucket mount check failed: {}", e);
                Err(e.to_string())
            }
        }
    }
}

/// S3-compatible object storage with a read-through template cache
pub struct ObjectStorage {
    client: Client,
    bucket: String,
    cache: Cache<String, Arc<Vec<u8>>>,
}

impl ObjectStorage {
    /// Create a new object storage instance
    ///
    /// # Errors
    ///
    /// Returns an error if endpoint, credentials or bucket are missing.
    pub async fn new(settings: &InferenceSettings) -> Result<Self, StorageError> {
        let endpoint_url = settings
            .storage_endpoint_url
            .as_ref()
            .ok_or_else(|| StorageError::Config("STORAGE_ENDPOINT_URL is missing".into()))?;
        let access_key = settings
            .storage_access_key_id
            .as_ref()
            .ok_or_else(|| StorageError::Config("STORAGE_ACCESS_KEY_ID is missing".into()))?;
        let secret_key = settings
            .storage_secret_access_key
            .as_ref()
            .ok_or_else(|| StorageError::Config("STORAGE_SECRET_ACCESS_KEY is missing".into()))?;
        let bucket = settings
            .bucket_name
            .as_ref()
            .ok_or_else(|| StorageError::Config("BUCKET_NAME is missing".into()))?;

        let credentials = Credentials::new(access_key, secret_key, None, None, "template-storage");

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(settings.storage_region.clone()))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint_url)
            .force_path_style(true)
            .build();

        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(TEMPLATE_CACHE_TTL_SECS))
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: bucket.clone(),
            cache,
        })
    }

    async fn fetch_bytes(&self, key: &str) -> Result<Arc<Vec<u8>>, StorageError> {
        if let Some(cached) = self.cache.get(key).await {
            return Ok(cached);
        }

        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
                    .into_bytes();
                let data = Arc::new(data.to_vec());
                self.cache.insert(key.to_string(), data.clone()).await;
                Ok(data)
            }
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::S3Get(Box::new(e))),
        }
    }
}

#[async_trait]
impl TemplateStore for ObjectStorage {
    async fn load_template(&self, key: &str) -> Result<Value, StorageError> {
        let data = self.fetch_bytes(key).await?;
        match serde_json::from_slice(&data) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Template {} is not valid JSON: {}", key, e);
                // Do not keep serving a broken object from cache
                self.cache.invalidate(key).await;
                Err(StorageError::Json(e))
            }
        }
    }

    async fn check_connection(&self) -> Result<(), String> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!("Object storage connection OK (bucket: {})", self.bucket);
                Ok(())
            }
            Err(e) => {
                error!("Object storage connection failed: {}", e);
                Err(e.to_string())
            }
        }
    }
}

/// Choose the template store from settings.
///
/// An explicit storage endpoint selects [`ObjectStorage`]; otherwise templates are
/// read through the bucket mount.
///
/// # Errors
///
/// Returns `StorageError::Config` if the bucket name or object storage settings are missing.
pub async fn build_template_store(
    settings: &InferenceSettings,
) -> Result<Arc<dyn TemplateStore>, StorageError> {
    let bucket = settings
        .bucket_name
        .as_deref()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| StorageError::Config("BUCKET_NAME is missing".into()))?;

    if settings.storage_endpoint_url.is_some() {
        debug!("Using object storage API for templates");
        Ok(Arc::new(ObjectStorage::new(settings).await?))
    } else {
        debug!(mount = %settings.storage_mount_path, "Using bucket mount for templates");
        Ok(Arc::new(MountedStorage::new(
            &settings.storage_mount_path,
            bucket,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mounted_with(key: &str, contents: &str) -> (tempfile::TempDir, MountedStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let bucket_dir = dir.path().join("templates");
        std::fs::create_dir_all(&bucket_dir).expect("create bucket dir");
        std::fs::write(bucket_dir.join(key), contents).expect("write template");
        let storage = MountedStorage::new(dir.path(), "templates");
        (dir, storage)
    }

    #[tokio::test]
    async fn test_mounted_storage_reads_json() {
        let (_dir, storage) = mounted_with("gpt.json", r#"{"messages": []}"#);

        let value = storage
            .load_template("gpt.json")
            .await
            .expect("template should load");
        assert!(value["messages"].is_array());
        assert!(storage.check_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_mounted_storage_missing_key() {
        let (_dir, storage) = mounted_with("gpt.json", "{}");

        let err = storage
            .load_template("ocr.json")
            .await
            .expect_err("missing object");
        assert!(matches!(err, StorageError::NotFound(key) if key == "ocr.json"));
    }

    #[tokio::test]
    async fn test_mounted_storage_rejects_invalid_json() {
        let (_dir, storage) = mounted_with("gpt.json", "not json");

        let err = storage.load_template("gpt.json").await.expect_err("bad json");
        assert!(matches!(err, StorageError::Json(_)));
    }

    #[tokio::test]
    async fn test_mounted_storage_rejects_traversal() {
        let (_dir, storage) = mounted_with("gpt.json", "{}");

        let err = storage
            .load_template("../secrets.json")
            .await
            .expect_err("traversal must be rejected");
        assert!(matches!(err, StorageError::Config(_)));
    }

    mod object {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const NO_SUCH_KEY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message><Key>missing.json</Key><RequestId>req-1</RequestId></Error>"#;

        fn settings(endpoint: String) -> InferenceSettings {
            InferenceSettings {
                bucket_name: Some("templates".to_string()),
                storage_endpoint_url: Some(endpoint),
                storage_access_key_id: Some("test-access".to_string()),
                storage_secret_access_key: Some("test-secret".to_string()),
                storage_region: "ru-central1".to_string(),
                ..InferenceSettings::default()
            }
        }

        async fn storage_for(server: &MockServer) -> ObjectStorage {
            ObjectStorage::new(&settings(server.uri()))
                .await
                .expect("object storage")
        }

        #[tokio::test]
        async fn test_missing_object_is_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/templates/missing.json"))
                .respond_with(
                    ResponseTemplate::new(404)
                        .insert_header("content-type", "application/xml")
                        .set_body_string(NO_SUCH_KEY),
                )
                .mount(&server)
                .await;

            let storage = storage_for(&server).await;
            let err = storage
                .load_template("missing.json")
                .await
                .expect_err("missing object");
            assert!(matches!(err, StorageError::NotFound(key) if key == "missing.json"));
        }

        #[tokio::test]
        async fn test_template_is_cached_after_first_load() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/templates/gpt.json"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(r#"{"messages": [{}, {}]}"#),
                )
                .expect(1)
                .mount(&server)
                .await;

            let storage = storage_for(&server).await;
            let first = storage.load_template("gpt.json").await.expect("first load");
            let second = storage.load_template("gpt.json").await.expect("cached load");
            assert_eq!(first, second);
            assert_eq!(first["messages"].as_array().map(Vec::len), Some(2));
        }

        #[tokio::test]
        async fn test_invalid_json_is_not_cached() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/templates/broken.json"))
                .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
                .expect(2)
                .mount(&server)
                .await;

            let storage = storage_for(&server).await;
            for _ in 0..2 {
                let err = storage
                    .load_template("broken.json")
                    .await
                    .expect_err("invalid json");
                assert!(matches!(err, StorageError::Json(_)));
            }
        }

        #[tokio::test]
        async fn test_endpoint_selects_object_storage() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/templates/ocr.json"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(r#"{"mimeType": "JPEG"}"#),
                )
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("HEAD"))
                .and(path("/templates"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;

            let mut settings = settings(server.uri());
            // A mount that does not exist; reaching the server proves the API path is used
            settings.storage_mount_path = "/nonexistent-mount".to_string();
            let store = build_template_store(&settings).await.expect("store");

            let value = store.load_template("ocr.json").await.expect("template");
            assert_eq!(value["mimeType"], "JPEG");
            assert!(store.check_connection().await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_build_template_store_requires_bucket() {
        let settings = InferenceSettings::default();
        let result = build_template_store(&settings).await;
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
