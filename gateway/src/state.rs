//! Shared application state.

use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::completion::{CompletionError, CompletionProvider, OpenAIChat};
use crate::core::session::SessionStore;
use crate::handlers::twiml::TwimlDocument;

/// State shared by every route and relay connection.
///
/// The session store and completion provider are injected here rather than
/// referenced as globals, so tests can build a state around a mock provider.
pub struct AppState {
    pub config: ServerConfig,
    pub sessions: SessionStore,
    pub completion: Arc<dyn CompletionProvider>,
    /// Webhook markup, rendered once from the configured domain and greeting
    pub twiml: TwimlDocument,
}

impl AppState {
    /// Build the state with the OpenAI chat provider from `config`.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, CompletionError> {
        let provider = OpenAIChat::new(config.completion_config())?;
        info!(
            provider = provider.name(),
            model = %provider.config().model,
            "Completion provider initialized"
        );
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Build the state around an explicit completion provider.
    pub fn with_provider(
        config: ServerConfig,
        completion: Arc<dyn CompletionProvider>,
    ) -> Arc<Self> {
        let sessions = SessionStore::new(config.system_prompt.clone());
        let twiml = TwimlDocument::new(&config.relay_ws_url(), &config.welcome_greeting);
        Arc::new(Self {
            config,
            sessions,
            completion,
            twiml,
        })
    }
}
