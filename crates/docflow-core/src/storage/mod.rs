//! Blob store gateway: object upload and JSON retrieval by URI.

mod memory;
#[cfg(feature = "aws")]
mod s3;

pub use memory::MemoryBlobStore;
#[cfg(feature = "aws")]
pub use s3::S3BlobStore;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{DocflowError, Result};

/// URI schemes accepted for stored objects.
const SCHEMES: [&str; 2] = ["s3", "store"];

/// A parsed `scheme://bucket/key` object location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUri {
    pub bucket: String,
    pub key: String,
}

impl StoreUri {
    /// Split a URI into bucket and key.
    ///
    /// Everything after the bucket, slashes included, is the key.
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| DocflowError::Parse(format!("not an object URI: {}", uri)))?;

        if !SCHEMES.contains(&scheme) {
            return Err(DocflowError::Parse(format!("unsupported URI scheme `{}`: {}", scheme, uri)));
        }

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() || key.is_empty() {
            return Err(DocflowError::Parse(format!("URI needs a bucket and a key: {}", uri)));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl std::fmt::Display for StoreUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Object storage treated as a flat key/value store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copy a local file to `bucket/key`.
    ///
    /// Fails with `NotFound` when the local file is missing and `Transport`
    /// when the store rejects the write.
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()>;

    /// Read the full body of an object.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Fetch an object by URI and decode its body as JSON.
    async fn fetch_json(&self, uri: &str) -> Result<Value> {
        let location = StoreUri::parse(uri)?;
        let body = self.get(&location.bucket, &location.key).await?;
        debug!(uri = %location, bytes = body.len(), "Fetched object");
        serde_json::from_slice(&body)
            .map_err(|e| DocflowError::Parse(format!("{}: {}", location, e)))
    }
}

/// Read a local file, reporting a missing path as `NotFound`.
pub(crate) async fn read_local(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DocflowError::NotFound(path.display().to_string())
        } else {
            DocflowError::Io(e)
        }
    })
}
