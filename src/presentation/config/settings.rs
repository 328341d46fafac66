use std::time::Duration;

use config::{Config, File};
use serde::Deserialize;

use crate::application::services::RetryPolicy;
use crate::domain::GenerationDefaults;
use crate::infrastructure::observability::TracingConfig;

use super::Environment;

pub const LLM_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const API_SECRET_KEY_VAR: &str = "API_SECRET_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub auth: AuthSettings,
    pub callback: CallbackSettings,
    pub rate_limit: RateLimitSettings,
    pub tracker: TrackerSettings,
    pub processing: ProcessingSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub api_version: String,
    pub default_model: String,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
    pub timeout_secs: u64,
    pub retry: RetrySettings,
}

impl LlmSettings {
    pub fn generation_defaults(&self) -> GenerationDefaults {
        GenerationDefaults {
            model: self.default_model.clone(),
            max_tokens: self.default_max_tokens,
            temperature: self.default_temperature,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub api_secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetrySettings,
}

impl CallbackSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Submissions per client per window.
    pub max_requests: u32,
    /// Requests of any kind per client per window.
    pub general_max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerSettings {
    pub retention_hours: i64,
    pub cleanup_interval_secs: u64,
}

impl TrackerSettings {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingSettings {
    pub stage_delay_ms: u64,
}

impl ProcessingSettings {
    pub fn stage_delay(&self) -> Duration {
        Duration::from_millis(self.stage_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingSecrets(Vec<&'static str>),
}

impl Settings {
    /// Loads defaults, `appsettings.{environment}`, `APP__*` variables and the
    /// two required secrets, in increasing precedence.
    pub fn load(environment: Environment) -> Result<Self, SettingsError> {
        Self::with_secrets(
            environment,
            std::env::var(LLM_API_KEY_VAR).ok(),
            std::env::var(API_SECRET_KEY_VAR).ok(),
        )
    }

    pub fn with_secrets(
        environment: Environment,
        llm_api_key: Option<String>,
        api_secret_key: Option<String>,
    ) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("llm.api_key", "")?
            .set_default("llm.base_url", "https://api.anthropic.com")?
            .set_default("llm.api_version", "2023-06-01")?
            .set_default("llm.default_model", "claude-3-5-sonnet-20241022")?
            .set_default("llm.default_max_tokens", 4096)?
            .set_default("llm.default_temperature", 1.0)?
            .set_default("llm.timeout_secs", 30 * 60)?
            .set_default("llm.retry.max_retries", 3)?
            .set_default("llm.retry.base_delay_ms", 1000)?
            .set_default("llm.retry.max_delay_ms", 30_000)?
            .set_default("auth.api_secret_key", "")?
            .set_default("callback.timeout_secs", 30)?
            .set_default("callback.user_agent", "prompt-relay/1.0")?
            .set_default("callback.retry.max_retries", 3)?
            .set_default("callback.retry.base_delay_ms", 1000)?
            .set_default("callback.retry.max_delay_ms", 10_000)?
            .set_default("rate_limit.max_requests", 100)?
            .set_default("rate_limit.general_max_requests", 200)?
            .set_default("rate_limit.window_secs", 15 * 60)?
            .set_default("tracker.retention_hours", 24)?
            .set_default("tracker.cleanup_interval_secs", 60 * 60)?
            .set_default("processing.stage_delay_ms", 0)?
            .set_default("logging.level", "info,prompt_relay=debug,tower_http=debug")?
            .set_default("logging.json", false)?
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("llm.api_key", llm_api_key)?
            .set_override_option("auth.api_secret_key", api_secret_key)?
            .build()?
            .try_deserialize()?;

        settings.ensure_secrets()?;
        Ok(settings)
    }

    fn ensure_secrets(&self) -> Result<(), SettingsError> {
        let mut missing = Vec::new();
        if self.llm.api_key.trim().is_empty() {
            missing.push(LLM_API_KEY_VAR);
        }
        if self.auth.api_secret_key.trim().is_empty() {
            missing.push(API_SECRET_KEY_VAR);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::MissingSecrets(missing))
        }
    }

    pub fn tracing_config(&self, environment: Environment) -> TracingConfig {
        TracingConfig {
            environment: environment.to_string(),
            json_format: self.logging.json,
            default_directive: self.logging.level.clone(),
        }
    }
}
