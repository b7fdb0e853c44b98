//! OpenAI Chat Completions client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::config::OpenAIChatConfig;
use super::messages::{ChatCompletionRequest, ChatCompletionResponse, OpenAIErrorResponse};
use crate::core::completion::base::{CompletionError, CompletionProvider, CompletionResult};
use crate::core::session::Turn;

/// Chat completion provider backed by the OpenAI REST API.
///
/// Every attempt is bounded by the configured timeout. Transient failures
/// (network, timeout, 429, 5xx) are retried according to the retry policy;
/// everything else is returned immediately.
pub struct OpenAIChat {
    config: OpenAIChatConfig,
    http_client: Client,
}

impl OpenAIChat {
    pub fn new(config: OpenAIChatConfig) -> CompletionResult<Self> {
        if config.api_key.is_empty() {
            return Err(CompletionError::InvalidConfiguration(
                "API key is required for OpenAI chat completions".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| {
                CompletionError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &OpenAIChatConfig {
        &self.config
    }

    /// Single request without retries.
    async fn send_once(&self, turns: &[Turn]) -> CompletionResult<String> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: turns,
        };

        let response = self
            .http_client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let response_text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(map_status_error(status, &response_text));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| CompletionError::InvalidResponse(format!("Malformed body: {e}")))?;

        parsed.into_first_content().ok_or_else(|| {
            CompletionError::InvalidResponse("Response contained no message content".to_string())
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAIChat {
    async fn complete(&self, turns: &[Turn]) -> CompletionResult<String> {
        let mut attempt: u32 = 0;
        loop {
            debug!(
                model = %self.config.model,
                turns = turns.len(),
                attempt,
                "Requesting chat completion"
            );

            match self.send_once(turns).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() && self.config.retry.should_retry(attempt + 1) => {
                    attempt += 1;
                    let delay = self.config.retry.calculate_delay(attempt);
                    warn!(
                        error = %e,
                        retry = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient completion failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn map_transport_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(format!("Request timed out: {e}"))
    } else if e.is_decode() {
        CompletionError::InvalidResponse(format!("Failed to read response: {e}"))
    } else {
        CompletionError::ConnectionFailed(format!("Request failed: {e}"))
    }
}

fn map_status_error(status: StatusCode, body: &str) -> CompletionError {
    let message = match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(error_response) => format!(
            "OpenAI API error ({}): {}",
            status.as_u16(),
            error_response.error.message
        ),
        Err(_) => format!("OpenAI API error ({}): {}", status.as_u16(), body),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CompletionError::AuthenticationFailed(message)
        }
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimitExceeded(message),
        s if s.is_server_error() => CompletionError::ProviderError(message),
        _ => CompletionError::InvalidRequest(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_api_key() {
        let result = OpenAIChat::new(OpenAIChatConfig::new(""));
        assert!(matches!(
            result,
            Err(CompletionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_name() {
        let chat = OpenAIChat::new(OpenAIChatConfig::new("sk-test")).unwrap();
        assert_eq!(chat.name(), "openai");
        assert_eq!(chat.config().model, "gpt-4o-mini");
    }

    #[test]
    fn test_map_status_error_uses_openai_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        let error = map_status_error(StatusCode::UNAUTHORIZED, body);
        match error {
            CompletionError::AuthenticationFailed(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("Incorrect API key provided"));
            }
            other => panic!("Expected AuthenticationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_map_status_error_classification() {
        assert!(matches!(
            map_status_error(StatusCode::FORBIDDEN, ""),
            CompletionError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            CompletionError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_GATEWAY, "upstream"),
            CompletionError::ProviderError(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_REQUEST, "bad"),
            CompletionError::InvalidRequest(_)
        ));
    }
}
