use common::config::StorageConfig;
use common::grading::FinalGradeStrategy;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Account created on startup when no admin exists yet.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued tokens. Default: 168 (7 days).
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

/// OpenAI-compatible chat completion endpoint used for task breakdowns.
#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ai_endpoint() -> String {
    "https://api.openai.com/v1".into()
}
fn default_ai_model() -> String {
    "gpt-4o-mini".into()
}
fn default_ai_timeout_secs() -> u64 {
    60
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ai_endpoint(),
            api_key: None,
            model: default_ai_model(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GradingConfig {
    #[serde(default)]
    pub final_grade_strategy: FinalGradeStrategy,
}

/// Sweep of upload URLs that were issued but never confirmed.
#[derive(Debug, Deserialize, Clone)]
pub struct ReconcileConfig {
    #[serde(default = "default_reconcile_enabled")]
    pub enabled: bool,
    /// Seconds between sweeps. Default: 900.
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
    /// Age after which an unconfirmed upload is treated as orphaned and can no
    /// longer be saved. Default: 86400.
    #[serde(default = "default_reconcile_grace_secs")]
    pub grace_secs: u64,
}

fn default_reconcile_enabled() -> bool {
    true
}
fn default_reconcile_interval_secs() -> u64 {
    15 * 60
}
fn default_reconcile_grace_secs() -> u64 {
    24 * 60 * 60
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconcile_enabled(),
            interval_secs: default_reconcile_interval_secs(),
            grace_secs: default_reconcile_grace_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., THESIS__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("THESIS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
