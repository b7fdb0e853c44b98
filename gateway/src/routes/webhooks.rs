//! Telephony webhook route configuration

use axum::{Router, routing::any};
use tower_http::trace::TraceLayer;

use crate::handlers::twiml::twiml_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the webhook router
///
/// # Endpoint
///
/// `ANY /twiml` - returns the ConversationRelay markup as `text/xml`
///
/// The telephony platform may call the webhook with GET or POST (form
/// encoded); the request body is not inspected.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/twiml", any(twiml_handler))
        .layer(TraceLayer::new_for_http())
}
