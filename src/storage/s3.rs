use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use futures::stream;
use futures::StreamExt;
use log::{error, info};
use std::path::Path;

use super::{check_key, BlobStore, BlobStream, StorageError, StorageResult};

/// S3 (or MinIO) backed blob store; one bucket, keys used verbatim.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub async fn ensure_bucket_exists(&self) -> StorageResult<()> {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            return Ok(());
        }

        info!("Bucket {} not found, creating it", self.bucket);
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                error!("Error creating bucket {}: {:?}", self.bucket, e);
                StorageError::Backend(format!("failed to create bucket {}: {}", self.bucket, e))
            })?;
        Ok(())
    }
}

fn get_error(key: &str, err: SdkError<GetObjectError>) -> StorageError {
    match err {
        SdkError::ServiceError(se) if se.err().is_no_such_key() => StorageError::NotFound(key.to_string()),
        other => StorageError::Backend(format!("{}: {}", key, other)),
    }
}

/// `Ok(false)` when the object is missing.
fn head_error(key: &str, err: SdkError<HeadObjectError>) -> StorageResult<bool> {
    match err {
        SdkError::ServiceError(se) if se.err().is_not_found() => Ok(false),
        other => Err(StorageError::Backend(format!("{}: {}", key, other))),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, source: &Path, content_type: &str) -> StorageResult<()> {
        check_key(key)?;
        let size = tokio::fs::metadata(source).await?.len();
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{}: {}", key, e)))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{}: {}", key, e)))?;

        info!("Stored blob {}/{} ({} bytes)", self.bucket, key, size);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<BlobStream> {
        check_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| get_error(key, e))?;

        let key = key.to_string();
        let chunks = stream::try_unfold((output.body, key), |(mut body, key)| async move {
            match body.next().await {
                Some(Ok(chunk)) => Ok(Some((chunk, (body, key)))),
                Some(Err(e)) => Err(StorageError::Backend(format!("{}: {}", key, e))),
                None => Ok(None),
            }
        });
        Ok(Box::pin(chunks))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        check_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("{}: {}", key, e)))?;

        info!("Deleted blob {}/{}", self.bucket, key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => head_error(key, e),
        }
    }
}
