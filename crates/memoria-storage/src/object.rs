use std::path::Path as FsPath;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use http::Method;
use memoria_core::config::StorageConfig;
use memoria_core::models::StorageDriver;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Attribute;
use object_store::Error as ObjectStoreError;
use object_store::GetOptions;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};
use tokio::io::AsyncReadExt;

use crate::traits::{validate_path, Storage, StorageError, StorageResult};

/// S3-compatible object storage implementation
#[derive(Clone, Debug)]
pub struct ObjectStorage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint: String,
    path_style: bool,
}

fn required<'a>(field: Option<&'a String>, name: &str) -> StorageResult<&'a str> {
    field
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            StorageError::Config(format!(
                "object-store target is missing required field '{}'",
                name
            ))
        })
}

impl ObjectStorage {
    /// Build a backend from a target's driver configuration.
    ///
    /// All of endpoint, region, bucket, key, and secret are required; a
    /// missing field fails here, at resolution time, not at first write.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let endpoint = required(config.endpoint.as_ref(), "endpoint")?.to_string();
        let region = required(config.region.as_ref(), "region")?.to_string();
        let bucket = required(config.bucket.as_ref(), "bucket")?.to_string();
        let key = required(config.key.as_ref(), "key")?;
        let secret = required(config.secret.as_ref(), "secret")?;

        let allow_http = endpoint.starts_with("http://");
        let store = AmazonS3Builder::new()
            .with_endpoint(endpoint.clone())
            .with_region(region.clone())
            .with_bucket_name(bucket.clone())
            .with_access_key_id(key)
            .with_secret_access_key(secret)
            .with_allow_http(allow_http)
            .with_virtual_hosted_style_request(!config.use_path_style_endpoint)
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(ObjectStorage {
            store,
            bucket,
            region,
            endpoint,
            path_style: config.use_path_style_endpoint,
        })
    }

    /// Public URL for an object.
    ///
    /// Path-style providers (MinIO and friends) use `{endpoint}/{bucket}/{key}`;
    /// otherwise the virtual-hosted form is derived from bucket and region.
    fn generate_url(&self, path: &str) -> String {
        if self.path_style {
            let base = self.endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base, self.bucket, path)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, path
            )
        }
    }
}

#[async_trait]
impl Storage for ObjectStorage {
    async fn exists(&self, path: &str) -> StorageResult<bool> {
        validate_path(path)?;
        let location = Path::from(path);
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        validate_path(path)?;
        let location = Path::from(path);

        let result: ObjectResult<_> = self.store.get(&location).await;
        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => StorageError::ReadFailed(other.to_string()),
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn write_file(&self, path: &str, source: &FsPath) -> StorageResult<u64> {
        validate_path(path)?;
        let location = Path::from(path);
        let start = std::time::Instant::now();

        // Read the staged file in chunks into a single payload. Restored
        // media are bounded by archive entry size, so a single put is
        // acceptable and keeps the object_store integration simple.
        let mut reader = tokio::fs::File::open(source).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to open source {}: {}",
                source.display(),
                e
            ))
        })?;
        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; 1024 * 1024];
        loop {
            let n = reader
                .read(&mut chunk)
                .await
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }

        let size = buffer.len() as u64;
        let bytes = Bytes::from(buffer);

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(bytes)).await;
        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                path = %path,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Object storage write failed"
            );
            StorageError::WriteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            path = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object storage write successful"
        );

        Ok(size)
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        validate_path(path)?;
        let location = Path::from(path);

        match self.store.delete(&location).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }

    async fn delete_all(&self, prefix: &str) -> StorageResult<()> {
        validate_path(prefix)?;
        let prefix_path = if prefix.is_empty() {
            None
        } else {
            Some(Path::from(prefix))
        };

        let mut listing = self.store.list(prefix_path.as_ref());
        let mut deleted = 0usize;
        while let Some(entry) = listing.next().await {
            let meta = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
            self.store
                .delete(&meta.location)
                .await
                .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;
            deleted += 1;
        }

        tracing::info!(
            bucket = %self.bucket,
            prefix = %prefix,
            deleted,
            "Object storage prefix removed"
        );

        Ok(())
    }

    async fn content_length(&self, path: &str) -> StorageResult<u64> {
        validate_path(path)?;
        let location = Path::from(path);
        let meta = self.store.head(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => StorageError::Backend(other.to_string()),
        })?;
        Ok(meta.size)
    }

    async fn content_type(&self, path: &str) -> StorageResult<Option<String>> {
        validate_path(path)?;
        let location = Path::from(path);
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .store
            .get_opts(&location, options)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(path.to_string()),
                other => StorageError::Backend(other.to_string()),
            })?;
        Ok(result
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| v.to_string()))
    }

    async fn last_modified(&self, path: &str) -> StorageResult<DateTime<Utc>> {
        validate_path(path)?;
        let location = Path::from(path);
        let meta = self.store.head(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => StorageError::Backend(other.to_string()),
        })?;
        Ok(meta.last_modified)
    }

    fn url(&self, path: &str) -> String {
        self.generate_url(path)
    }

    async fn presigned_url(&self, path: &str, expires_in: Duration) -> StorageResult<String> {
        validate_path(path)?;
        let location = Path::from(path);
        let url: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;
        Ok(url
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .to_string())
    }

    fn driver(&self) -> StorageDriver {
        StorageDriver::ObjectStore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_core::models::{StorageDriver, Visibility};

    fn full_config() -> StorageConfig {
        StorageConfig {
            driver: StorageDriver::ObjectStore,
            root: None,
            url: None,
            visibility: Visibility::Private,
            key: Some("minio".to_string()),
            secret: Some("minio123".to_string()),
            region: Some("us-east-1".to_string()),
            bucket: Some("memories".to_string()),
            endpoint: Some("http://localhost:9000".to_string()),
            use_path_style_endpoint: true,
        }
    }

    #[test]
    fn test_missing_field_is_config_error() {
        for field in ["endpoint", "region", "bucket", "key", "secret"] {
            let mut config = full_config();
            match field {
                "endpoint" => config.endpoint = None,
                "region" => config.region = None,
                "bucket" => config.bucket = None,
                "key" => config.key = None,
                _ => config.secret = None,
            }
            let err = ObjectStorage::from_config(&config).unwrap_err();
            match err {
                StorageError::Config(msg) => assert!(msg.contains(field), "{}: {}", field, msg),
                other => panic!("expected Config error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_path_style_url_shape() {
        let storage = ObjectStorage::from_config(&full_config()).unwrap();
        assert_eq!(
            storage.url("ab12.jpg"),
            "http://localhost:9000/memories/ab12.jpg"
        );
    }

    #[test]
    fn test_virtual_hosted_url_shape() {
        let mut config = full_config();
        config.endpoint = Some("https://s3.us-east-1.amazonaws.com".to_string());
        config.use_path_style_endpoint = false;
        let storage = ObjectStorage::from_config(&config).unwrap();
        assert_eq!(
            storage.url("ab12.jpg"),
            "https://memories.s3.us-east-1.amazonaws.com/ab12.jpg"
        );
    }
}
