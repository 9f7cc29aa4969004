//! Remote Privacy Filter client (spec §6.3 wire protocol), with a
//! degraded local fallback when the service is unreachable.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::error::PrivacyError;
use crate::local::remove_pii_local;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct PrivacyFilterConfig {
    pub base_url: String,
    pub api_key: String,
}

pub struct PrivacyFilterClient {
    client: Client,
    config: PrivacyFilterConfig,
}

#[derive(Debug, Clone, Serialize)]
struct RemovePiiRequest<'a> {
    text: &'a str,
    language: &'a str,
    include_metadata: bool,
    custom_protection_terms: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
struct RemovePiiResponse {
    cleaned_text: String,
    #[allow(dead_code)]
    processing_time_ms: Option<u64>,
    #[allow(dead_code)]
    language_used: Option<String>,
    metadata: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct PiiRemovalResult {
    pub cleaned_text: String,
    /// Set when the remote service was unreachable and the local regex
    /// fallback produced a best-effort result instead.
    pub degraded: bool,
    pub metadata: Option<Value>,
}

impl PrivacyFilterClient {
    pub fn new(config: PrivacyFilterConfig) -> Result<Self, PrivacyError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| PrivacyError::TransientTransport(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// `remove_pii(text, language, protected_terms) -> (cleaned_text, metadata)`.
    ///
    /// Falls back to the local regex-only filter (flagging `degraded=true`)
    /// if the remote service fails on every attempt.
    pub async fn remove_pii(
        &self,
        text: &str,
        language: &str,
        protected_terms: &[String],
    ) -> PiiRemovalResult {
        match self.call_remote(text, language, protected_terms).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "privacy filter unreachable, using local fallback");
                PiiRemovalResult {
                    cleaned_text: remove_pii_local(text, protected_terms),
                    degraded: true,
                    metadata: None,
                }
            }
        }
    }

    async fn call_remote(
        &self,
        text: &str,
        language: &str,
        protected_terms: &[String],
    ) -> Result<PiiRemovalResult, PrivacyError> {
        let url = format!("{}/remove-pii", self.config.base_url.trim_end_matches('/'));
        let body = RemovePiiRequest {
            text,
            language,
            include_metadata: true,
            custom_protection_terms: protected_terms,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: RemovePiiResponse = resp
                        .json()
                        .await
                        .map_err(|e| PrivacyError::SchemaError(e.to_string()))?;
                    return Ok(PiiRemovalResult {
                        cleaned_text: parsed.cleaned_text,
                        degraded: false,
                        metadata: parsed.metadata,
                    });
                }
                Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
                    return Err(PrivacyError::AuthFailure);
                }
                Ok(_) | Err(_) if attempt < MAX_ATTEMPTS => continue,
                Ok(resp) => {
                    return Err(PrivacyError::TransientTransport(format!(
                        "status {}",
                        resp.status()
                    )));
                }
                Err(e) => return Err(PrivacyError::TransientTransport(e.to_string())),
            }
        }
    }
}
