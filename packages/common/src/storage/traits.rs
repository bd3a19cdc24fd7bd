use async_trait::async_trait;

use super::error::StorageError;

/// Object store handing out time-limited signed URLs.
///
/// File bytes never pass through the server: clients upload and download
/// directly against the URLs returned here.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Signed URL permitting a single `PUT` of `key`.
    async fn upload_url(&self, key: &str, content_type: &str) -> Result<String, StorageError>;

    /// Signed URL permitting a `GET` of `key`, served as an attachment named `file_name`.
    async fn download_url(&self, key: &str, file_name: &str) -> Result<String, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}
