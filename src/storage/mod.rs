//! Blob storage for uploaded video assets.
//!
//! Every key is namespaced by the owning record: `{owner_id}/{file_name}`.
//! Blob stores never take part in the database transaction, so writers are
//! expected to delete what they stored when a later step fails.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::Path;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

pub mod local;
pub mod s3;

pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Blob contents, yielded chunk by chunk.
pub type BlobStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the contents of the file at `source` under `key`, replacing any
    /// existing blob. The file is streamed, never read into memory whole.
    async fn put(&self, key: &str, source: &Path, content_type: &str) -> StorageResult<()>;

    async fn get(&self, key: &str) -> StorageResult<BlobStream>;

    /// Delete the blob at `key`. Deleting a missing blob is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;
}

/// Key of a file owned by a catalog record.
pub fn namespaced_key(owner_id: Uuid, file_name: &str) -> String {
    format!("{}/{}", owner_id, file_name)
}

/// Rejects keys that could escape the namespace of a store.
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
