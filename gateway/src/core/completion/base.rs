//! Base traits and types for chat completion providers.
//!
//! A completion provider receives the full ordered transcript of a call and
//! returns the single reply the assistant should speak next.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::session::Turn;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The provider could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The request did not finish within the configured timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The provider rejected the credentials (401/403)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider throttled the request (429)
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The provider rejected the request as invalid (other 4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider failed while handling the request (5xx)
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// The response body could not be interpreted as a completion
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The provider could not be constructed from its configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl CompletionError {
    /// Whether another attempt could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CompletionError::ConnectionFailed(_)
                | CompletionError::Timeout(_)
                | CompletionError::RateLimitExceeded(_)
                | CompletionError::ProviderError(_)
        )
    }
}

/// Result type for completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;

// =============================================================================
// Retry Policy
// =============================================================================

/// Retry behavior for transient provider failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt. 0 disables retrying.
    /// Default: 1
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds).
    /// Default: 250ms
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay (milliseconds).
    /// Default: 2000ms
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff.
    /// Default: 2.0
    pub backoff_multiplier: f32,

    /// Whether to add jitter to the delay.
    /// Default: true
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay_ms: 250,
            max_delay_ms: 2000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), using exponential backoff.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay_ms as f64;
        let multiplier = self.backoff_multiplier as f64;

        let delay = base_delay * multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = delay.min(self.max_delay_ms as f64);

        let delay = if self.jitter {
            // Up to 25% either way, never above the cap
            (delay + rand_jitter(delay * 0.25)).clamp(0.0, self.max_delay_ms as f64)
        } else {
            delay
        };
        Duration::from_millis(delay as u64)
    }

    /// Whether retry number `attempt` (1-based) is allowed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }
}

/// Pseudo-random jitter in `-range..=range` from a simple LCG over the clock.
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;
    let seed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let random = ((seed.wrapping_mul(1103515245).wrapping_add(12345)) % (1 << 31)) as f64;
    let normalized = random / (1u64 << 31) as f64;
    (normalized - 0.5) * 2.0 * range
}

// =============================================================================
// Provider Trait
// =============================================================================

/// A chat completion backend.
///
/// Implementations must be stateless with respect to calls: everything the
/// provider needs is in `turns`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate the assistant reply for the given ordered transcript.
    async fn complete(&self, turns: &[Turn]) -> CompletionResult<String>;

    /// Short provider name used in logs.
    fn name(&self) -> &str;
}
