//! Relay WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::config::RELAY_WS_PATH;
use crate::handlers::relay::relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for the ConversationRelay protocol
///
/// # Example
///
/// ```json
/// // Platform sends
/// {"type": "setup", "callSid": "CA123"}
/// {"type": "prompt", "voicePrompt": "Hello"}
///
/// // Server responds
/// {"type": "text", "token": "Hi there", "last": true}
/// ```
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(RELAY_WS_PATH, get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
