//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `relay` - ConversationRelay WebSocket (per-call conversation)
//! - `twiml` - Telephony webhook markup

pub mod api;
pub mod relay;
pub mod twiml;

// Re-export commonly used handlers for convenient access
pub use relay::relay_handler;
pub use twiml::twiml_handler;
