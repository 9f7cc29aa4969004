//! HTTP backend implementing the wire protocol in spec §6.2: POST
//! `{base_url}/chat/completions` with an OpenAI-compatible body, bearer
//! token auth. Used for OVH AI Endpoints and any compatible provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role, estimate_tokens};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct ChatCompletionsBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
}

impl ChatCompletionsBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Builds a backend from the environment variables named in spec §6.6.
    pub fn from_env() -> Result<Self, LlmError> {
        let base_url = std::env::var("OVH_AI_BASE_URL").map_err(|_| {
            LlmError::Misconfiguration("OVH_AI_BASE_URL is not set".to_string())
        })?;
        let api_key = std::env::var("OVH_AI_ENDPOINTS_ACCESS_TOKEN").map_err(|_| {
            LlmError::Misconfiguration("OVH_AI_ENDPOINTS_ACCESS_TOKEN is not set".to_string())
        })?;
        Self::new(base_url, api_key)
    }

    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: m.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for ChatCompletionsBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let started = std::time::Instant::now();

        debug!(
            provider = "chat_completions",
            model = %inv.model,
            max_tokens = inv.max_tokens,
            temperature = inv.temperature,
            "invoking LLM"
        );

        let body = WireRequest {
            model: inv.model.clone(),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: inv.max_tokens,
            temperature: inv.temperature,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = self
            .client
            .client()
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "chat_completions")
            .await?;

        let wire: WireResponse = response.json().await.map_err(|e| LlmError::SchemaError {
            provider: "chat_completions".to_string(),
            message: format!("failed to parse response: {e}"),
        })?;

        let choice = wire.choices.first().ok_or_else(|| LlmError::SchemaError {
            provider: "chat_completions".to_string(),
            message: "response had no choices".to_string(),
        })?;

        let text = choice
            .message
            .content
            .clone()
            .ok_or_else(|| LlmError::SchemaError {
                provider: "chat_completions".to_string(),
                message: "choices[0].message.content was missing".to_string(),
            })?;

        let (input_tokens, output_tokens, estimated) = match wire.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens, false),
            None => {
                let input_text: String = inv
                    .messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                (estimate_tokens(&input_text), estimate_tokens(&text), true)
            }
        };

        Ok(LlmResult {
            text,
            provider: "chat_completions".to_string(),
            model_used: inv.model,
            input_tokens,
            output_tokens,
            estimated,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponseMessage {
    #[allow(dead_code)]
    role: String,
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_messages_preserves_role_and_order() {
        let messages = vec![
            Message::system("trusted instructions"),
            Message::user("sanitized document text"),
        ];
        let wire = ChatCompletionsBackend::convert_messages(&messages);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[1].content, "sanitized document text");
    }

    #[test]
    fn from_env_fails_closed_without_credentials() {
        unsafe {
            std::env::remove_var("OVH_AI_BASE_URL");
            std::env::remove_var("OVH_AI_ENDPOINTS_ACCESS_TOKEN");
        }
        assert!(ChatCompletionsBackend::from_env().is_err());
    }
}
