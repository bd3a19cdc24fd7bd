mod error;
mod memory;
#[cfg(feature = "object-storage")]
mod s3_store;
mod traits;

use std::sync::Arc;

pub use error::StorageError;
pub use memory::MemoryObjectStore;
#[cfg(feature = "object-storage")]
pub use s3_store::S3ObjectStore;
pub use traits::ObjectStore;

use crate::config::{StorageBackend, StorageConfig};

/// Build the object store selected by `config.backend`.
pub fn build_object_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object store; uploaded files are not persisted");
            Ok(Arc::new(MemoryObjectStore::new(
                config.bucket.clone(),
                config.url_expiry_secs,
            )))
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => Ok(Arc::new(S3ObjectStore::new(config)?)),
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => Err(StorageError::Config(
            "built without the `object-storage` feature".into(),
        )),
    }
}
