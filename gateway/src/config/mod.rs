//! Configuration module for the relay gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use relay_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

mod env;
mod merge;
mod validation;
mod yaml;

pub use validation::MAX_COMPLETION_RETRIES;
pub use yaml::YamlConfig;

use crate::core::completion::{OpenAIChatConfig, RetryConfig};

/// Default listening host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Path of the relay WebSocket endpoint, as advertised in the webhook markup
pub const RELAY_WS_PATH: &str = "/ws";

/// Greeting the telephony platform speaks when the relay connects
pub const DEFAULT_WELCOME_GREETING: &str =
    "Hi! I am a voice assistant powered by Twilio and Open A I. Ask me anything!";

/// First turn of every call transcript
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. This conversation is \
    being translated to voice, so answer carefully. When you respond, please spell out all \
    numbers, for example twenty not 20. Do not include emojis in your responses. Do not \
    include bullet points, asterisks, or special symbols.";

/// Spoken to the caller when the completion provider fails
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "I'm sorry, I'm having trouble answering right now. Could you please say that again?";

/// Configuration loading errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid value for {key} ({value}): {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Server configuration
///
/// Contains all configuration needed to run the relay gateway:
/// - Server settings (host, port, public domain)
/// - Completion provider settings (API key, base URL, model, timeout, retries)
/// - Conversation texts (system prompt, welcome greeting, fallback message)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Public host name (no scheme) the telephony platform connects to
    pub domain: String,

    // Completion provider
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub completion_timeout_seconds: u64,
    pub completion_max_retries: u32,

    // Conversation
    pub system_prompt: String,
    pub welcome_greeting: String,
    pub fallback_message: String,
}

/// Zeroize the provider credential when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.openai_api_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults).
    ///
    /// The `.env` file, if any, is loaded in `main.rs` before this runs.
    ///
    /// # Errors
    /// Returns an error if `OPENAI_API_KEY` or `DOMAIN` is missing, or if any
    /// value fails to parse or validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if the YAML file cannot be read or is malformed, if a
    /// required value is missing from every source, or if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_domain(&self.domain)?;
        validation::validate_completion_settings(
            self.completion_timeout_seconds,
            self.completion_max_retries,
        )
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public WebSocket URL the telephony platform is told to open
    pub fn relay_ws_url(&self) -> String {
        format!("wss://{}{}", self.domain, RELAY_WS_PATH)
    }

    /// Per-attempt timeout for completion requests
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_seconds)
    }

    /// Build the OpenAI chat client configuration
    pub fn completion_config(&self) -> OpenAIChatConfig {
        OpenAIChatConfig::new(self.openai_api_key.clone())
            .with_base_url(self.openai_base_url.clone())
            .with_model(self.openai_model.clone())
            .with_timeout(self.completion_timeout())
            .with_retry(RetryConfig {
                max_retries: self.completion_max_retries,
                ..Default::default()
            })
    }
}
