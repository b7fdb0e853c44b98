pub mod completion;
pub mod session;

// Re-export commonly used types for convenience
pub use completion::{
    CompletionError, CompletionProvider, CompletionResult, OpenAIChat, OpenAIChatConfig,
    RetryConfig,
};
pub use session::{Role, SessionError, SessionResult, SessionStore, Turn};
