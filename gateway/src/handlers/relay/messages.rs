//! ConversationRelay WebSocket message types
//!
//! Incoming frames are UTF-8 JSON objects discriminated by `type`. They are
//! parsed and validated here, before any handler logic runs, so the handler
//! only ever sees well-formed [`IncomingMessage`] values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum allowed size for a prompt's transcribed text (16 KB)
pub const MAX_PROMPT_SIZE: usize = 16 * 1024;

// =============================================================================
// Incoming Messages (Telephony platform -> Server)
// =============================================================================

/// Incoming WebSocket messages from the telephony platform
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncomingMessage {
    /// Start of a call; carries the call identifier
    Setup(SetupMessage),

    /// A complete transcribed caller utterance
    Prompt(PromptMessage),

    /// The caller spoke over the assistant
    Interrupt(InterruptMessage),
}

/// `setup` payload
///
/// Only `callSid` is required; the remaining call metadata is informational.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub call_sid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_parameters: Option<serde_json::Value>,
}

/// `prompt` payload
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptMessage {
    pub voice_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<bool>,
}

/// `interrupt` payload
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptMessage {
    /// What the caller had heard of the reply when they cut in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance_until_interrupt: Option<String>,
    /// Sent as either a number or a numeric string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_until_interrupt_ms: Option<serde_json::Value>,
}

/// Reasons an incoming frame is rejected at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Message is missing a string 'type' field")]
    MissingType,

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Invalid '{message_type}' message: {reason}")]
    InvalidPayload {
        message_type: String,
        reason: String,
    },

    #[error("Binary frames are not part of the relay protocol")]
    UnexpectedBinary,
}

impl IncomingMessage {
    /// Parse and validate one text frame.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| MessageError::InvalidJson(e.to_string()))?;

        let message_type = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(MessageError::MissingType)?
            .to_string();

        if !matches!(message_type.as_str(), "setup" | "prompt" | "interrupt") {
            return Err(MessageError::UnknownType(message_type));
        }

        let message: IncomingMessage =
            serde_json::from_value(value).map_err(|e| MessageError::InvalidPayload {
                message_type: message_type.clone(),
                reason: e.to_string(),
            })?;

        message.validate().map_err(|reason| MessageError::InvalidPayload {
            message_type,
            reason,
        })?;

        Ok(message)
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            IncomingMessage::Setup(setup) if setup.call_sid.trim().is_empty() => {
                Err("callSid must not be empty".to_string())
            }
            IncomingMessage::Prompt(prompt) if prompt.voice_prompt.len() > MAX_PROMPT_SIZE => {
                Err(format!(
                    "voicePrompt exceeds maximum size of {MAX_PROMPT_SIZE} bytes"
                ))
            }
            _ => Ok(()),
        }
    }

    /// Protocol name of this message, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            IncomingMessage::Setup(_) => "setup",
            IncomingMessage::Prompt(_) => "prompt",
            IncomingMessage::Interrupt(_) => "interrupt",
        }
    }
}

// =============================================================================
// Outgoing Messages (Server -> Telephony platform)
// =============================================================================

/// Outgoing WebSocket messages to the telephony platform
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingMessage {
    /// Text to be spoken to the caller
    Text {
        token: String,
        /// Whether this token completes the reply
        last: bool,
    },
}

impl OutgoingMessage {
    /// A complete reply sent as a single token
    pub fn reply(text: impl Into<String>) -> Self {
        OutgoingMessage::Text {
            token: text.into(),
            last: true,
        }
    }
}

/// Routes for the connection's sender task
#[derive(Debug)]
pub enum MessageRoute {
    Outgoing(OutgoingMessage),
    Close,
}
