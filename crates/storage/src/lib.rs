//! Object storage disks.
//!
//! Uploaded files go to one [`StorageDisk`] chosen at startup from
//! [`StorageConfig`]: the local filesystem, an S3 bucket, or a Cloudflare R2
//! bucket (S3 API with a per-account endpoint).

use std::sync::Arc;

use async_trait::async_trait;

pub mod config;
pub mod local;
pub mod s3;

pub use config::{DiskKind, S3Config, StorageConfig};
pub use local::LocalDisk;
pub use s3::S3Disk;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object key is empty, absolute, or escapes the disk root.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote object store rejected or failed the request.
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

/// A place objects can be written to and served from.
#[async_trait]
pub trait StorageDisk: Send + Sync {
    /// Disk name recorded on each asset row (`"local"`, `"s3"`, `"r2"`).
    fn name(&self) -> &str;

    /// Write `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Remove the object. Returns `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Public URL the object is served from.
    fn url(&self, key: &str) -> String;
}

impl std::fmt::Debug for dyn StorageDisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageDisk").field("name", &self.name()).finish()
    }
}

/// Construct the disk selected by `config`.
pub async fn build_disk(config: &StorageConfig) -> Result<Arc<dyn StorageDisk>, StorageError> {
    let disk: Arc<dyn StorageDisk> = match config.disk {
        DiskKind::Local => Arc::new(LocalDisk::new(&config.local_root, &config.public_url)),
        DiskKind::S3 | DiskKind::R2 => {
            let s3 = config.s3.as_ref().ok_or_else(|| {
                StorageError::Config(format!("{} disk requires S3 settings", config.disk))
            })?;
            Arc::new(S3Disk::connect(config.disk.as_str(), s3, &config.public_url).await?)
        }
    };
    tracing::info!(disk = disk.name(), "Storage disk ready");
    Ok(disk)
}

/// Reject keys that could address anything outside the disk's namespace.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Join a public URL prefix and an object key with exactly one slash.
pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}
