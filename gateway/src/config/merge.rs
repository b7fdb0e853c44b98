use super::env::EnvConfig;
use super::yaml::YamlConfig;
use super::{
    ConfigError, DEFAULT_FALLBACK_MESSAGE, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_WELCOME_GREETING, ServerConfig,
};
use crate::core::completion::openai::{
    DEFAULT_CHAT_MODEL, DEFAULT_COMPLETION_TIMEOUT, OPENAI_API_BASE_URL,
};
use crate::core::completion::RetryConfig;

/// Merge environment variables (base) with optional YAML overrides.
///
/// Priority: YAML > environment (including `.env`) > defaults. Fails when a
/// required value is missing from every source.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let env = EnvConfig::from_env()?;
    merge(env, yaml.unwrap_or_default())
}

pub(crate) fn merge(env: EnvConfig, yaml: YamlConfig) -> Result<ServerConfig, ConfigError> {
    let server = yaml.server.unwrap_or_default();
    let completion = yaml.completion.unwrap_or_default();
    let conversation = yaml.conversation.unwrap_or_default();

    let openai_api_key = completion
        .api_key
        .or(env.openai_api_key)
        .ok_or(ConfigError::MissingRequired("OPENAI_API_KEY"))?;
    let domain = server
        .domain
        .or(env.domain)
        .ok_or(ConfigError::MissingRequired("DOMAIN"))?;

    Ok(ServerConfig {
        host: server
            .host
            .or(env.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),
        domain,
        openai_api_key,
        openai_base_url: completion
            .base_url
            .or(env.openai_base_url)
            .unwrap_or_else(|| OPENAI_API_BASE_URL.to_string()),
        openai_model: completion
            .model
            .or(env.openai_model)
            .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        completion_timeout_seconds: completion
            .timeout_seconds
            .or(env.completion_timeout_seconds)
            .unwrap_or(DEFAULT_COMPLETION_TIMEOUT.as_secs()),
        completion_max_retries: completion
            .max_retries
            .or(env.completion_max_retries)
            .unwrap_or(RetryConfig::default().max_retries),
        system_prompt: conversation
            .system_prompt
            .or(env.system_prompt)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        welcome_greeting: conversation
            .welcome_greeting
            .or(env.welcome_greeting)
            .unwrap_or_else(|| DEFAULT_WELCOME_GREETING.to_string()),
        fallback_message: conversation
            .fallback_message
            .or(env.fallback_message)
            .unwrap_or_else(|| DEFAULT_FALLBACK_MESSAGE.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::{CompletionYaml, ServerYaml};

    fn required_env() -> EnvConfig {
        EnvConfig {
            domain: Some("env.example.com".to_string()),
            openai_api_key: Some("sk-env".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = merge(required_env(), YamlConfig::default()).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.completion_timeout_seconds, 30);
        assert_eq!(config.completion_max_retries, 1);
        assert_eq!(config.welcome_greeting, DEFAULT_WELCOME_GREETING);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_yaml_overrides_env() {
        let yaml = YamlConfig {
            server: Some(ServerYaml {
                port: Some(9000),
                domain: Some("yaml.example.com".to_string()),
                ..Default::default()
            }),
            completion: Some(CompletionYaml {
                model: Some("gpt-4o".to_string()),
                ..Default::default()
            }),
            conversation: None,
        };
        let mut env = required_env();
        env.port = Some(7000);
        env.openai_model = Some("gpt-env".to_string());

        let config = merge(env, yaml).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.domain, "yaml.example.com");
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.openai_api_key, "sk-env");
    }

    #[test]
    fn test_missing_api_key() {
        let env = EnvConfig {
            domain: Some("example.com".to_string()),
            ..Default::default()
        };
        let result = merge(env, YamlConfig::default());
        assert!(matches!(
            result,
            Err(ConfigError::MissingRequired("OPENAI_API_KEY"))
        ));
    }

    #[test]
    fn test_missing_domain() {
        let env = EnvConfig {
            openai_api_key: Some("sk-env".to_string()),
            ..Default::default()
        };
        let result = merge(env, YamlConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingRequired("DOMAIN"))));
    }
}
