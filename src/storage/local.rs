use async_trait::async_trait;
use bytes::BytesMut;
use futures::stream;
use log::info;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

use super::{check_key, BlobStore, BlobStream, StorageError, StorageResult};

const READ_CHUNK: usize = 64 * 1024;

/// Filesystem-backed blob store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }

    async fn copy_into(&self, source: &Path, path: &Path) -> std::io::Result<u64> {
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).await?;
        match fs::copy(source, path).await {
            // the owner directory can vanish under a concurrent delete
            Err(e) if e.kind() == ErrorKind::NotFound && !parent.exists() => {
                fs::create_dir_all(parent).await?;
                fs::copy(source, path).await
            }
            other => other,
        }
    }

    /// Removes the owner directory of `path` once it holds no more blobs.
    async fn prune_parent(&self, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        if parent != self.root && fs::remove_dir(parent).await.is_ok() {
            info!("Removed empty blob directory {}", parent.display());
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, source: &Path, _content_type: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let size = self.copy_into(source, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!("failed to write {}: {}", path.display(), e))
        })?;

        info!("Stored blob {} ({} bytes)", key, size);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<BlobStream> {
        let path = self.path_for(key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buf = BytesMut::with_capacity(READ_CHUNK);
            let read = file.read_buf(&mut buf).await?;
            let next: StorageResult<_> = Ok((read > 0).then(|| (buf.freeze(), file)));
            next
        });
        Ok(Box::pin(chunks))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted blob {}", key);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "failed to remove {}: {}",
                    path.display(),
                    e
                )))
            }
        }
        self.prune_parent(&path).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }
}
