//! Completion gateway.
//!
//! Forwards a call transcript to a chat completion provider and returns the
//! generated reply. The relay handler only sees the [`CompletionProvider`]
//! trait, so providers can be swapped (or mocked in tests) through
//! [`AppState`](crate::state::AppState).

mod base;
pub mod openai;

pub use base::{CompletionError, CompletionProvider, CompletionResult, RetryConfig};
pub use openai::{OpenAIChat, OpenAIChatConfig};
