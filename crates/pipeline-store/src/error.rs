use pipeline_utils::error::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("connection pool exhausted or unavailable: {0}")]
    Pool(String),

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("encryption key missing or invalid: {0}")]
    Encryption(String),

    #[error("stored value could not be decoded: {0}")]
    Codec(String),
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Database(_) => ErrorKind::TransientTransport,
            StoreError::Pool(_) => ErrorKind::TransientTransport,
            StoreError::JobNotFound(_) => ErrorKind::Validation,
            StoreError::Encryption(_) => ErrorKind::Validation,
            StoreError::Codec(_) => ErrorKind::Validation,
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
