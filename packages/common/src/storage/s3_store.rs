use std::collections::HashMap;

use async_trait::async_trait;
use http::HeaderMap;
use http::header::{CONTENT_TYPE, HeaderValue};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::traits::ObjectStore;
use crate::config::StorageConfig;

/// S3-compatible object store using presigned URLs.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    expiry_secs: u32,
}

impl S3ObjectStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<Region>()
                .map_err(|e| StorageError::Config(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            expiry_secs: config.url_expiry_secs,
        })
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

/// Headers signed into an upload URL; the client must send the same Content-Type.
fn content_type_headers(content_type: &str) -> Result<HeaderMap, StorageError> {
    let value = HeaderValue::from_str(content_type)
        .map_err(|_| StorageError::Config(format!("invalid content type: {content_type:?}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, value);
    Ok(headers)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload_url(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        let headers = content_type_headers(content_type)?;
        self.bucket
            .presign_put(key, self.expiry_secs, Some(headers), None)
            .await
            .map_err(backend)
    }

    async fn download_url(&self, key: &str, file_name: &str) -> Result<String, StorageError> {
        let mut queries = HashMap::new();
        queries.insert(
            "response-content-disposition".to_string(),
            format!("attachment; filename=\"{file_name}\""),
        );
        self.bucket
            .presign_get(key, self.expiry_secs, Some(queries))
            .await
            .map_err(backend)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.bucket.head_object(key).await {
            Ok((_, status)) => Ok((200..300).contains(&status)),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        if !self.exists(key).await? {
            return Ok(false);
        }
        let response = self.bucket.delete_object(key).await.map_err(backend)?;
        Ok((200..300).contains(&response.status_code()))
    }
}
