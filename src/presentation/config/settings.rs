use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File};
use serde::Deserialize;

use super::Environment;
use crate::application::services::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub analysis: AnalysisSettings,
    pub retry: RetrySettings,
    pub llm: LlmSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

/// Request defaults applied when a caller leaves a field out.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    pub default_batch_size: u32,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Settings {
    /// Defaults, then `appsettings.toml`, then `appsettings.{env}.toml`, then
    /// `APP_`-prefixed variables such as `APP_DATABASE__URL`.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Self::builder(environment)?.build()?.try_deserialize()
    }

    pub fn builder(environment: Environment) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("analysis.default_batch_size", 10)?
            .set_default("analysis.default_max_tokens", 500)?
            .set_default("analysis.default_temperature", 0.7)?
            .set_default("analysis.queue_capacity", 64)?
            .set_default("retry.max_retries", 3)?
            .set_default("retry.initial_delay_ms", 1000)?
            .set_default("retry.max_delay_ms", 60_000)?
            .set_default("llm.request_timeout_secs", 120)?
            .set_default("logging.level", "info")?
            .set_default("logging.enable_json", environment == Environment::Prod)?
            .add_source(File::with_name("appsettings").required(false))
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            ))
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl LlmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
