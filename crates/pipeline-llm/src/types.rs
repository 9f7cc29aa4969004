//! Core types for the LLM client abstraction (component C).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::LlmError;

/// Role of a message in a conversation. System messages carry the trusted
/// `system_prompt`; user messages carry the sanitized, substituted
/// template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// One call to `complete()`.
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    pub job_id: String,
    pub step_name: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-step override of the default request timeout (spec default 120s).
    pub timeout: Duration,
    pub messages: Vec<Message>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(
        job_id: impl Into<String>,
        step_name: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            step_name: step_name.into(),
            model: model.into(),
            temperature,
            max_tokens,
            timeout,
            messages,
            metadata: HashMap::new(),
        }
    }
}

/// Result of `complete()`. Token counts are provider-reported when
/// available; otherwise estimated via a word-count heuristic and flagged
/// `estimated=true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    pub text: String,
    pub provider: String,
    pub model_used: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated: bool,
    pub latency_ms: u64,
}

/// Providers implement this trait; the executor only ever talks to
/// `dyn LlmBackend`.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}

/// Estimates tokens at ~0.75 words per token, per the token-accounting
/// fallback contract.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count() as f64;
    (words / 0.75).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_is_proportional_to_word_count() {
        assert_eq!(estimate_tokens(""), 0);
        assert!(estimate_tokens("one two three four") >= 4);
    }
}
