//! OpenAI Chat Completions configuration.

use std::time::Duration;

use crate::core::completion::base::RetryConfig;

/// Default OpenAI REST API base URL.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default per-attempt request timeout.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`OpenAIChat`](super::OpenAIChat).
///
/// `base_url` may point at any OpenAI-compatible server; the client appends
/// `/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAIChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Bound on a single HTTP attempt, including reading the body
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Drop for OpenAIChatConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.api_key.zeroize();
    }
}

impl OpenAIChatConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            timeout: DEFAULT_COMPLETION_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Full URL of the chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
