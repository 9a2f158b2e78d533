//! Object storage for generated artifacts (user data exports).
//!
//! | Env var                 | Default      |
//! |-------------------------|--------------|
//! | `OBJECT_STORE_PROVIDER` | `filesystem` |
//! | `OBJECT_STORE_PATH`     | `./exports`  |
//! | `S3_BUCKET`             | (required for s3) |
//! | `S3_PREFIX`             | (none)       |

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

const DEFAULT_STORE_PATH: &str = "./exports";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Invalid object store configuration: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn save(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
}

/// Keys are relative, `/`-separated, and may not climb out of the store.
fn check_key(key: &str) -> Result<&Path, StorageError> {
    let path = Path::new(key);
    let valid = !key.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(path)
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Writes objects as files below a root directory.
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn save(&self, key: &str, _content_type: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.root.join(check_key(key)?);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), "Object written");
        Ok(())
    }
}

/// Writes objects to an S3 bucket, optionally under a key prefix.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    fn object_key(&self, key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}/{key}")
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn save(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        check_key(key)?;
        let object_key = self.object_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;
        tracing::debug!(bucket = %self.bucket, key = %object_key, "Object uploaded");
        Ok(())
    }
}

/// Build the configured object store from environment variables.
pub async fn store_from_env() -> Result<Arc<dyn ObjectStore>, StorageError> {
    let provider = std::env::var("OBJECT_STORE_PROVIDER").unwrap_or_else(|_| "filesystem".into());
    match provider.trim().to_ascii_lowercase().as_str() {
        "" | "filesystem" => {
            let root = std::env::var("OBJECT_STORE_PATH").unwrap_or_else(|_| DEFAULT_STORE_PATH.into());
            Ok(Arc::new(FilesystemStore::new(root)))
        }
        "s3" => {
            let bucket = std::env::var("S3_BUCKET")
                .ok()
                .filter(|b| !b.trim().is_empty())
                .ok_or_else(|| StorageError::Config("S3_BUCKET is required for the s3 provider".into()))?;
            let prefix = std::env::var("S3_PREFIX").unwrap_or_default();
            let aws = aws_config::load_from_env().await;
            Ok(Arc::new(S3Store::new(aws_sdk_s3::Client::new(&aws), bucket, prefix)))
        }
        other => Err(StorageError::Config(format!("unknown object store provider: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn filesystem_store_writes_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        store
            .save("reports/r1.json", "application/json", b"{}".to_vec())
            .await
            .unwrap();
        let written = std::fs::read(dir.path().join("reports/r1.json")).unwrap();
        assert_eq!(written, b"{}");
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        for key in ["../evil", "/etc/passwd", "", "a/../../b"] {
            assert_matches!(
                store.save(key, "text/plain", Vec::new()).await,
                Err(StorageError::InvalidKey(_)),
                "{key}"
            );
        }
    }
}
