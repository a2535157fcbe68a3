//! In-process blob store.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{BlobStore, read_local};
use crate::error::{DocflowError, Result};

type Objects = BTreeMap<(String, String), Vec<u8>>;

/// Blob store backed by a map, used by the pipeline tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<Objects>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, Objects> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store raw bytes at `bucket/key`.
    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects().insert((bucket.to_string(), key.to_string()), body);
    }

    /// Store a JSON document at `bucket/key`.
    pub fn insert_json(&self, bucket: &str, key: &str, value: &Value) {
        self.insert(bucket, key, value.to_string().into_bytes());
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects().contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// All stored keys in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = read_local(local_path).await?;
        debug!(key = %key, bucket = %bucket, size = body.len(), "Stored in memory");
        self.insert(bucket, key, body);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.objects()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| DocflowError::Transport(format!("NoSuchKey: s3://{}/{}", bucket, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let store = MemoryBlobStore::new();
        store.upload(&path, "b", "in/a.pdf").await.unwrap();

        assert!(store.contains("b", "in/a.pdf"));
        assert_eq!(store.get("b", "in/a.pdf").await.unwrap(), b"%PDF-1.7");
        assert_eq!(store.keys("b"), vec!["in/a.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let store = MemoryBlobStore::new();
        let result = store.upload(Path::new("/nonexistent/a.pdf"), "b", "k").await;
        assert!(matches!(result, Err(DocflowError::NotFound(_))));
    }
}
