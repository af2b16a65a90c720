use std::num::NonZeroUsize;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub documents: DocumentsConfig,
    pub sessions: SessionsConfig,
    pub secrets: SecretsConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub base_url: String,
    /// Left unset, the provider picks its default chat model.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    pub chunk_size: NonZeroUsize,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionsConfig {
    /// Sessions untouched for this long are dropped; 0 keeps them.
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl SessionsConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretsConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeatureFlags {
    pub document_upload_enabled: bool,
    /// Send a session's attached snippets along with each chat request.
    pub document_grounding: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}
