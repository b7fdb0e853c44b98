//! Per-call conversation state.
//!
//! A session maps one telephony call identifier to the ordered transcript of
//! that call. Sessions live only between the `setup` message and the close of
//! the relay connection that created them.

mod store;

pub use store::SessionStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by [`SessionStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A session for this call identifier is already active
    #[error("Session already exists for call {0}")]
    AlreadyExists(String),

    /// No session is active for this call identifier
    #[error("No such session: {0}")]
    NotFound(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a conversation transcript.
///
/// Serializes to the `{"role": ..., "content": ...}` shape expected by chat
/// completion APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
