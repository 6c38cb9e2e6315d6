//! Configuration loading, validation, and management for QuranLens.
//!
//! Loads configuration from `~/.quranlens/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod output_tokens;

pub use output_tokens::{OutputTokenLimit, OutputTokenLimits};

/// The root configuration structure.
///
/// Maps directly to `~/.quranlens/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-completion provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Query embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Agent loop budgets and prompt
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default = "default_provider_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used when a request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sent as `HTTP-Referer` (OpenRouter app attribution)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,

    /// Sent as `X-Title` (OpenRouter app attribution)
    #[serde(default = "default_app_title")]
    pub title: String,
}

fn default_provider_name() -> String {
    "openrouter".into()
}
fn default_provider_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_app_title() -> String {
    "QuranLens".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_provider_url(),
            api_key: None,
            default_model: default_model(),
            referer: None,
            title: default_app_title(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("default_model", &self.default_model)
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Must match the dimension of the stored verse embeddings
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: u32,
}

fn default_embedding_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-large".into()
}
fn default_embedding_dimensions() -> u32 {
    3072
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_url(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; without one the gateway serves from an empty in-memory store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact(&self.url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on model turns per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Records of one tool result forwarded into the transcript
    #[serde(default = "default_max_tool_results")]
    pub max_tool_results: usize,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Per-model output token caps
    #[serde(default)]
    pub output_tokens: OutputTokenLimits,
}

fn default_max_iterations() -> u32 {
    5
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tool_results() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            temperature: default_temperature(),
            max_tool_results: default_max_tool_results(),
            system_prompt_override: None,
            output_tokens: OutputTokenLimits::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.quranlens/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load configuration from `path`, then apply environment overrides.
    ///
    /// Recognized variables:
    /// - `OPENROUTER_API_KEY`: chat provider key
    /// - `OPENAI_API_KEY`: embedding provider key
    /// - `DATABASE_URL`
    /// - `QURANLENS_MODEL`: default chat model
    /// - `QURANLENS_PORT`: gateway port
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = var("OPENROUTER_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(model) = var("QURANLENS_MODEL") {
            self.provider.default_model = model;
        }
        if let Some(port) = var("QURANLENS_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("QURANLENS_PORT '{port}' is not a port number"))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quranlens")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.default_model must not be empty".into(),
            ));
        }

        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.max_tool_results == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_results must be at least 1".into(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be at least 1".into(),
            ));
        }

        self.agent.output_tokens.validate()
    }

    /// A copy safe to print: secrets replaced by a marker.
    pub fn redacted(&self) -> Self {
        let hide = |s: &Option<String>| s.as_ref().map(|_| "[REDACTED]".to_string());
        let mut copy = self.clone();
        copy.provider.api_key = hide(&self.provider.api_key);
        copy.embedding.api_key = hide(&self.embedding.api_key);
        copy.database.url = hide(&self.database.url);
        copy
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
