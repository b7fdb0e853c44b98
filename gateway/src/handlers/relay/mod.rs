//! ConversationRelay WebSocket handlers
//!
//! This module implements the server side of the telephony platform's
//! ConversationRelay protocol: transcribed caller speech arrives as JSON text
//! frames and generated replies are sent back as text to be spoken.
//!
//! # Protocol
//!
//! ## Platform → Server
//!
//! - **setup**: `{"type":"setup","callSid":"CA..."}` starts the call session
//! - **prompt**: `{"type":"prompt","voicePrompt":"..."}` a caller utterance
//! - **interrupt**: `{"type":"interrupt",...}` the caller spoke over a reply
//!
//! ## Server → Platform
//!
//! - **text**: `{"type":"text","token":"...","last":true}` a complete reply
//!
//! Malformed or out-of-order frames are logged and ignored; a run of
//! consecutive bad frames closes the connection.

mod handler;
pub mod messages;

pub use handler::{MAX_CONSECUTIVE_VIOLATIONS, relay_handler};
