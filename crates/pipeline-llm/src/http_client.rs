//! Retry-with-backoff wrapper around `reqwest`.
//!
//! Transport errors and 5xx responses are retried independently of a
//! step's own retry policy: base 500ms, cap 8s, jitter ±25%, at most 3
//! attempts total.

use rand::Rng;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

use crate::error::LlmError;

const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(8);
const MAX_ATTEMPTS: u32 = 3;

pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, LlmError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Executes `request`, retrying transport errors and 5xx responses up
    /// to `MAX_ATTEMPTS` times with exponential backoff and jitter.
    pub async fn execute_with_retry(
        &self,
        request: RequestBuilder,
        timeout: Duration,
        provider: &str,
    ) -> Result<Response, LlmError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let Some(cloned) = request.try_clone() else {
                return Err(LlmError::Misconfiguration(
                    "request body is not cloneable for retry".to_string(),
                ));
            };

            let outcome = tokio::time::timeout(timeout, cloned.send()).await;

            match outcome {
                Ok(Ok(response)) if response.status().is_success() => return Ok(response),
                Ok(Ok(response)) if response.status().is_server_error() && attempt < MAX_ATTEMPTS => {
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                Ok(Ok(response)) if response.status() == reqwest::StatusCode::UNAUTHORIZED => {
                    return Err(LlmError::AuthFailure {
                        provider: provider.to_string(),
                    });
                }
                Ok(Ok(response)) if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    return Err(LlmError::QuotaExceeded {
                        provider: provider.to_string(),
                    });
                }
                Ok(Ok(response)) => {
                    return Err(LlmError::SchemaError {
                        provider: provider.to_string(),
                        message: format!("unexpected status {}", response.status()),
                    });
                }
                Ok(Err(e)) if attempt < MAX_ATTEMPTS => {
                    tracing::debug!(provider, attempt, error = %e, "retrying after transport error");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                Ok(Err(e)) => {
                    return Err(LlmError::TransientTransport {
                        provider: provider.to_string(),
                        message: e.to_string(),
                    });
                }
                Err(_elapsed) if attempt < MAX_ATTEMPTS => {
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                Err(_elapsed) => {
                    return Err(LlmError::TransientTransport {
                        provider: provider.to_string(),
                        message: "request timed out".to_string(),
                    });
                }
            }
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY.as_millis() as u64 * 2u64.pow(attempt.saturating_sub(1));
    let capped = exp.min(MAX_DELAY.as_millis() as u64);
    let jitter_fraction = rand::thread_rng().gen_range(-0.25..=0.25);
    let jittered = (capped as f64 * (1.0 + jitter_fraction)).max(0.0) as u64;
    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_never_exceeds_cap_even_with_jitter() {
        for attempt in 1..10 {
            let delay = backoff_delay(attempt);
            assert!(delay <= MAX_DELAY + MAX_DELAY / 4);
        }
    }

    #[test]
    fn backoff_grows_with_attempt_number() {
        assert!(backoff_delay(1) <= backoff_delay(2) + Duration::from_millis(200));
    }
}
