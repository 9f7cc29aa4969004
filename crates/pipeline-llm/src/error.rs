use pipeline_utils::error::{Classify, ErrorKind};
use thiserror::Error;

/// LLM client error taxonomy (component C's uniform error taxonomy).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transient transport error calling {provider}: {message}")]
    TransientTransport { provider: String, message: String },

    #[error("{provider} rejected credentials")]
    AuthFailure { provider: String },

    #[error("{provider} quota exceeded")]
    QuotaExceeded { provider: String },

    #[error("{provider} model unavailable: {model}")]
    ModelUnavailable { provider: String, model: String },

    #[error("malformed response from {provider}: {message}")]
    SchemaError { provider: String, message: String },

    #[error("misconfiguration: {0}")]
    Misconfiguration(String),
}

impl Classify for LlmError {
    fn kind(&self) -> ErrorKind {
        match self {
            LlmError::TransientTransport { .. } => ErrorKind::TransientTransport,
            LlmError::AuthFailure { .. } => ErrorKind::AuthFailure,
            LlmError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            // Retried as transient first; fatal only after the backend gives up retrying.
            LlmError::ModelUnavailable { .. } => ErrorKind::TransientTransport,
            LlmError::SchemaError { .. } => ErrorKind::AuthFailure,
            LlmError::Misconfiguration(_) => ErrorKind::AuthFailure,
        }
    }
}
