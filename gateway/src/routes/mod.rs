pub mod api;
pub mod relay;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Assemble every route of the gateway around `state`
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::create_api_router())
        .merge(webhooks::create_webhook_router())
        .merge(relay::create_relay_router())
        .with_state(state)
}
