use pipeline_utils::error::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrivacyError {
    #[error("transient transport error calling privacy filter: {0}")]
    TransientTransport(String),

    #[error("privacy filter rejected credentials")]
    AuthFailure,

    #[error("malformed response from privacy filter: {0}")]
    SchemaError(String),
}

impl Classify for PrivacyError {
    fn kind(&self) -> ErrorKind {
        match self {
            PrivacyError::TransientTransport(_) => ErrorKind::TransientTransport,
            PrivacyError::AuthFailure => ErrorKind::AuthFailure,
            PrivacyError::SchemaError(_) => ErrorKind::AuthFailure,
        }
    }
}
