//! Configuration loading, validation, and management for Snoid.
//!
//! Loads configuration from `~/.snoid/config.toml` with environment
//! variable overrides. Validates all settings once at startup; the result is
//! shared read-only with the message router for the process lifetime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.snoid/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Model used for the yes/no decision gate
    #[serde(default = "default_cheap_model")]
    pub cheap_model: String,

    /// Model used for critiques and greetings
    #[serde(default = "default_expensive_model")]
    pub expensive_model: String,

    /// Prior channel messages included in each transcript
    #[serde(default = "default_history_count")]
    pub history_count: usize,

    /// Maximum characters kept per transcript line body
    #[serde(default = "default_truncate_length")]
    pub truncate_length: usize,

    /// Name token the bot answers greetings to
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Greeting keywords, matched as plain substrings
    #[serde(default = "default_greeting_tokens")]
    pub greeting_tokens: Vec<String>,

    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prefix for downstream commands (`!ping`)
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// HTTP client timeout for completion and transport calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// OpenAI API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Discord bot token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_bot_token: Option<String>,

    /// Custom model pricing overrides (model name → per-1K-token rates)
    #[serde(default)]
    pub pricing: HashMap<String, PricingOverrideConfig>,
}

fn default_cheap_model() -> String {
    "gpt-4o-mini".into()
}
fn default_expensive_model() -> String {
    "gpt-4o".into()
}
fn default_history_count() -> usize {
    9
}
fn default_truncate_length() -> usize {
    500
}
fn default_bot_name() -> String {
    "snoid".into()
}
fn default_greeting_tokens() -> Vec<String> {
    [
        "hey", "hi", "hello", "yo", "sup", "what's up", "whats up", "wassup", "howdy", "hiya",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_command_prefix() -> String {
    "!".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("cheap_model", &self.cheap_model)
            .field("expensive_model", &self.expensive_model)
            .field("history_count", &self.history_count)
            .field("truncate_length", &self.truncate_length)
            .field("bot_name", &self.bot_name)
            .field("greeting_tokens", &self.greeting_tokens)
            .field("log_level", &self.log_level)
            .field("command_prefix", &self.command_prefix)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("discord_bot_token", &redact(&self.discord_bot_token))
            .field("pricing", &self.pricing)
            .finish()
    }
}

/// Per-1K-token pricing override for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// USD per 1,000 input tokens
    pub input_per_1k: f64,
    /// USD per 1,000 output tokens
    pub output_per_1k: f64,
}

/// Discord caps a single history page at 100 messages.
const MAX_HISTORY_COUNT: usize = 100;

impl BotConfig {
    /// Load from `path`, apply process environment overrides, and validate.
    ///
    /// A missing file yields the defaults. See
    /// [`BotConfig::apply_env_overrides`] for the variables consulted.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load from `path` with environment values taken from `lookup`.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides (highest priority).
    ///
    /// - `CHEAP_MODEL`, `THINKING_MODEL` — the two model tiers
    /// - `SNOID_BOT_NAME`, `SNOID_HISTORY_COUNT`, `SNOID_LOG_LEVEL`
    /// - `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `DISCORD_BOT_TOKEN`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = lookup("CHEAP_MODEL") {
            self.cheap_model = model;
        }
        if let Some(model) = lookup("THINKING_MODEL") {
            self.expensive_model = model;
        }
        if let Some(name) = lookup("SNOID_BOT_NAME") {
            self.bot_name = name;
        }
        if let Some(count) = lookup("SNOID_HISTORY_COUNT") {
            self.history_count = count.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "SNOID_HISTORY_COUNT must be a non-negative integer, got {count:?}"
                ))
            })?;
        }
        if let Some(level) = lookup("SNOID_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.openai_base_url = url;
        }
        if let Some(token) = lookup("DISCORD_BOT_TOKEN") {
            self.discord_bot_token = Some(token);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".snoid")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cheap_model.trim().is_empty() || self.expensive_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "cheap_model and expensive_model must not be empty".into(),
            ));
        }

        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bot_name must not be empty".into(),
            ));
        }

        if !self.greeting_tokens.iter().any(|t| !t.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "greeting_tokens must contain at least one non-empty token".into(),
            ));
        }

        if self.truncate_length == 0 {
            return Err(ConfigError::ValidationError(
                "truncate_length must be > 0".into(),
            ));
        }

        if self.history_count > MAX_HISTORY_COUNT {
            return Err(ConfigError::ValidationError(format!(
                "history_count must be at most {MAX_HISTORY_COUNT}"
            )));
        }

        for (model, price) in &self.pricing {
            if price.input_per_1k < 0.0 || price.output_per_1k < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "pricing for '{model}' must not be negative"
                )));
            }
        }

        Ok(())
    }

    /// The OpenAI key, or a hard startup error.
    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("OPENAI_API_KEY"))
    }

    /// The Discord token, or a hard startup error.
    pub fn require_discord_token(&self) -> Result<&str, ConfigError> {
        self.discord_bot_token
            .as_deref()
            .ok_or(ConfigError::MissingCredential("DISCORD_BOT_TOKEN"))
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            cheap_model: default_cheap_model(),
            expensive_model: default_expensive_model(),
            history_count: default_history_count(),
            truncate_length: default_truncate_length(),
            bot_name: default_bot_name(),
            greeting_tokens: default_greeting_tokens(),
            log_level: default_log_level(),
            command_prefix: default_command_prefix(),
            request_timeout_secs: default_request_timeout_secs(),
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            discord_bot_token: None,
            pricing: HashMap::new(),
        }
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

    #[error("Missing credential: set {0}")]
    MissingCredential(&'static str),
}
