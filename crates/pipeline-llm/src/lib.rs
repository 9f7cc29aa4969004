//! LLM client abstraction (component C): a uniform `complete`-style call
//! to a remote chat-completions provider, with system/user role
//! separation, token accounting, and retry on transport errors.

pub mod chat_completions_backend;
pub mod error;
pub(crate) mod http_client;
pub mod types;

pub use chat_completions_backend::ChatCompletionsBackend;
pub use error::LlmError;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role, estimate_tokens};
