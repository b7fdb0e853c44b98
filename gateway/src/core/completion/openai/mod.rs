//! OpenAI Chat Completions provider.
//!
//! Sends the call transcript to `POST {base_url}/chat/completions` and
//! returns `choices[0].message.content`.
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_gateway::core::completion::{CompletionProvider, OpenAIChat, OpenAIChatConfig};
//! use relay_gateway::core::session::Turn;
//!
//! let chat = OpenAIChat::new(OpenAIChatConfig::new("sk-...").with_model("gpt-4o-mini"))?;
//! let reply = chat.complete(&[Turn::system("Be brief."), Turn::user("Hello")]).await?;
//! ```

mod client;
mod config;
mod messages;

pub use client::OpenAIChat;
pub use config::{
    DEFAULT_CHAT_MODEL, DEFAULT_COMPLETION_TIMEOUT, OPENAI_API_BASE_URL, OpenAIChatConfig,
};
pub use messages::{ChatCompletionRequest, ChatCompletionResponse, OpenAIErrorResponse};
