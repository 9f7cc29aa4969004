use pipeline_utils::error::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read bootstrap file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("failed to parse bootstrap file {path}: {source}")]
    Toml { path: String, #[source] source: toml::de::Error },
    #[error("invalid bootstrap value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error(transparent)]
    Store(#[from] pipeline_store::StoreError),
}

impl Classify for ConfigError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Io { .. } => ErrorKind::Validation,
            ConfigError::Toml { .. } => ErrorKind::Validation,
            ConfigError::InvalidValue { .. } => ErrorKind::Validation,
            ConfigError::Store(e) => e.kind(),
        }
    }
}
