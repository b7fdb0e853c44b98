use std::env;
use std::str::FromStr;

use super::ConfigError;

/// Raw values read from environment variables.
///
/// Empty variables are treated as unset so `DOMAIN=` in a `.env` file
/// behaves the same as a missing `DOMAIN`.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub domain: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub completion_timeout_seconds: Option<u64>,
    pub completion_max_retries: Option<u32>,
    pub system_prompt: Option<String>,
    pub welcome_greeting: Option<String>,
    pub fallback_message: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_var("HOST"),
            port: parse_env_var("PORT")?,
            domain: env_var("DOMAIN"),
            openai_api_key: env_var("OPENAI_API_KEY"),
            openai_base_url: env_var("OPENAI_BASE_URL"),
            openai_model: env_var("OPENAI_MODEL"),
            completion_timeout_seconds: parse_env_var("COMPLETION_TIMEOUT_SECONDS")?,
            completion_max_retries: parse_env_var("COMPLETION_MAX_RETRIES")?,
            system_prompt: env_var("SYSTEM_PROMPT"),
            welcome_greeting: env_var("WELCOME_GREETING"),
            fallback_message: env_var("FALLBACK_MESSAGE"),
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env_var<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
