//! AWS S3 blob store.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use super::{BlobStore, read_local};
use crate::error::{DocflowError, Result};

/// Blob store backed by S3.
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    /// Create a store from shared AWS configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        info!(region = ?sdk_config.region(), "Initialized S3 blob store");
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        let data = read_local(local_path).await?;
        let size = data.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| DocflowError::Transport(format!("upload s3://{}/{}: {}", bucket, key, e)))?;

        debug!(key = %key, bucket = %bucket, size = size, "Uploaded to S3");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| DocflowError::Transport(format!("get s3://{}/{}: {}", bucket, key, e)))?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| DocflowError::Transport(format!("read s3://{}/{}: {}", bucket, key, e)))?;

        Ok(bytes.into_bytes().to_vec())
    }
}
