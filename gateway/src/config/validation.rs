use url::Url;

use super::ConfigError;

/// Upper bound for completion retries. Each retry keeps a caller waiting.
pub const MAX_COMPLETION_RETRIES: u32 = 5;

/// Validate the public domain used to build the relay WebSocket URL.
///
/// The domain must be a bare host (optionally with a port): no scheme, no
/// path, no whitespace, and `wss://{domain}/ws` must parse as a URL.
pub fn validate_domain(domain: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDomain {
        domain: domain.to_string(),
        reason: reason.to_string(),
    };

    if domain.is_empty() {
        return Err(invalid("domain is empty"));
    }
    if domain.contains("://") {
        return Err(invalid("domain must not include a scheme"));
    }
    if domain.contains('/') {
        return Err(invalid("domain must not include a path"));
    }
    if domain.chars().any(char::is_whitespace) {
        return Err(invalid("domain must not contain whitespace"));
    }

    let url = Url::parse(&format!("wss://{domain}/ws")).map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("domain has no host"));
    }

    Ok(())
}

/// Validate completion timeout and retry bounds.
pub fn validate_completion_settings(
    timeout_seconds: u64,
    max_retries: u32,
) -> Result<(), ConfigError> {
    if timeout_seconds == 0 {
        return Err(ConfigError::InvalidValue {
            key: "COMPLETION_TIMEOUT_SECONDS",
            value: timeout_seconds.to_string(),
            reason: "timeout must be greater than zero".to_string(),
        });
    }
    if max_retries > MAX_COMPLETION_RETRIES {
        return Err(ConfigError::InvalidValue {
            key: "COMPLETION_MAX_RETRIES",
            value: max_retries.to_string(),
            reason: format!("at most {MAX_COMPLETION_RETRIES} retries are allowed"),
        });
    }
    Ok(())
}
