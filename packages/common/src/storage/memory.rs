use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::error::StorageError;
use super::traits::ObjectStore;

/// In-process object store.
///
/// Signed URLs use a `memory://` scheme and cannot be fetched; callers
/// simulate the client-side upload with [`MemoryObjectStore::put`].
pub struct MemoryObjectStore {
    bucket: String,
    expiry_secs: u32,
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>, expiry_secs: u32) -> Self {
        Self {
            bucket: bucket.into(),
            expiry_secs,
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Store an object, as a client holding an upload URL would.
    pub async fn put(&self, key: &str, data: Vec<u8>) {
        self.objects.write().await.insert(key.to_string(), data);
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn signed_url(&self, key: &str, method: &str, extra: &str) -> String {
        let expires = Utc::now() + Duration::seconds(i64::from(self.expiry_secs));
        format!(
            "memory://{}/{}?method={}&expires={}{}",
            self.bucket,
            key,
            method,
            expires.timestamp(),
            extra
        )
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload_url(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        Ok(self.signed_url(key, "PUT", &format!("&content-type={content_type}")))
    }

    async fn download_url(&self, key: &str, file_name: &str) -> Result<String, StorageError> {
        if !self.objects.read().await.contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(self.signed_url(key, "GET", &format!("&filename={file_name}")))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.write().await.remove(key).is_some())
    }
}
