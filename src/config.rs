//! Configuration management for Parley
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Configuration is read once at startup; there is no runtime reloading.

use crate::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Parley
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion endpoint settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Chat behavior settings
    #[serde(default)]
    pub chat: ChatConfig,
    /// History storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for the API
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Connection timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System prompt placed before the session history
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Assistant message appended when a completion fails
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    /// Maximum title length in characters
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. Answer in a professional and friendly manner.".to_string()
}

/// Message shown in place of a reply when the completion request fails
pub fn default_fallback_message() -> String {
    "Sorry, I ran into a problem. Please try again later.".to_string()
}

fn default_title_max_chars() -> usize {
    crate::session::TITLE_MAX_CHARS
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            fallback_message: default_fallback_message(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

/// History storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database directory; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ParleyError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ParleyError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Some(api_key) = std::env::var("PARLEY_API_KEY")
            .ok()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        {
            self.api.api_key = Some(api_key);
        }

        if let Ok(base_url) = std::env::var("PARLEY_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            self.api.model = model;
        }

        if let Ok(timeout) = std::env::var("PARLEY_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid PARLEY_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(prompt) = std::env::var("PARLEY_SYSTEM_PROMPT") {
            self.chat.system_prompt = prompt;
        }

        if let Ok(db_path) = std::env::var("PARLEY_HISTORY_DB") {
            tracing::debug!(db_path = %db_path, "Env override: PARLEY_HISTORY_DB");
            self.storage.path = Some(PathBuf::from(db_path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(model) = &cli.model {
            self.api.model = model.clone();
        }
        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    /// Validate the configuration
    ///
    /// The API key is not checked here; it is only required once a
    /// completion client is built, so history commands work without one.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.api.model.trim().is_empty() {
            return Err(ParleyError::Config("api.model cannot be empty".to_string()).into());
        }

        match url::Url::parse(&self.api.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(ParleyError::Config(format!(
                    "api.base_url must use http or https, got {}",
                    url.scheme()
                ))
                .into());
            }
            Err(e) => {
                return Err(ParleyError::Config(format!(
                    "Invalid api.base_url {}: {}",
                    self.api.base_url, e
                ))
                .into());
            }
        }

        if self.api.timeout_seconds == 0 {
            return Err(ParleyError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.title_max_chars == 0 {
            return Err(ParleyError::Config(
                "chat.title_max_chars must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
