//! Configuration management for evaluation runs
//!
//! Loads provider, model and runner settings from a TOML file, then applies
//! `LLM_MODEL` / `LLM_TEMPERATURE` environment overrides on top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::runner::ExecutorConfig;

/// Environment variable overriding the model name
pub const MODEL_ENV: &str = "LLM_MODEL";
/// Environment variable overriding the sampling temperature
pub const TEMPERATURE_ENV: &str = "LLM_TEMPERATURE";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Chat-completions endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Requests per minute
    #[serde(default = "default_rpm")]
    pub rpm: u32,
    /// Tokens per minute
    #[serde(default = "default_tpm")]
    pub tpm: u32,
}

/// Sampling settings shared by every call of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Overrides `provider.default_model` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_parallel_requests")]
    pub parallel_requests: usize,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_provider_name() -> String { "openai".to_string() }
fn default_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_rpm() -> u32 { 500 }
fn default_tpm() -> u32 { 200_000 }
fn default_max_tokens() -> u32 { 2048 }
fn default_parallel_requests() -> usize { 2 }
fn default_retry_count() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 1000 }
fn default_max_retry_delay_ms() -> u64 { 60_000 }
fn default_timeout_ms() -> u64 { 120_000 }

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            rpm: default_rpm(),
            tpm: default_tpm(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel_requests: default_parallel_requests(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default config locations or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = ["evalkit.toml", "config/evalkit.toml"];

        for path in &config_paths {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path);
                    return config;
                }
                Err(e) => tracing::warn!("Ignoring {}: {}", path, e),
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply `LLM_MODEL` and `LLM_TEMPERATURE` from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            tracing::debug!("{} overrides model: {}", MODEL_ENV, model);
            self.llm.model = Some(model.trim().to_string());
        }

        if let Some(raw) = lookup(TEMPERATURE_ENV) {
            let temperature: f32 = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} is not a number: {:?}", TEMPERATURE_ENV, raw))
            })?;
            self.llm.temperature = temperature;
        }

        self.validate()
    }

    /// Model used for every call: the override if set, else the provider default
    pub fn model(&self) -> &str {
        self.llm
            .model
            .as_deref()
            .unwrap_or(&self.provider.default_model)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            parallel_requests: self.runner.parallel_requests,
            retry_count: self.runner.retry_count,
            retry_delay_ms: self.runner.retry_delay_ms,
            max_retry_delay_ms: self.runner.max_retry_delay_ms,
            timeout_ms: self.runner.timeout_ms,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }
        if self.runner.parallel_requests == 0 {
            return Err(ConfigError::Invalid(
                "parallel_requests must be at least 1".to_string(),
            ));
        }
        if self.provider.rpm == 0 {
            return Err(ConfigError::Invalid("rpm must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
