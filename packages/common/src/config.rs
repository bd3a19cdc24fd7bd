use serde::Deserialize;

/// Which object store backs submission files.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    /// Process-local store, for development and tests.
    Memory,
}

/// Object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket holding submission files. Default: "submissions".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Address the bucket by path instead of subdomain. Default: false.
    #[serde(default)]
    pub path_style: bool,
    /// Lifetime of signed URLs in seconds. Default: 900.
    #[serde(default = "default_url_expiry_secs")]
    pub url_expiry_secs: u32,
}

fn default_bucket() -> String {
    "submissions".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_url_expiry_secs() -> u32 {
    900
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            path_style: false,
            url_expiry_secs: default_url_expiry_secs(),
        }
    }
}
