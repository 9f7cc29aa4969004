use pipeline_utils::error::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("prompt template references undefined placeholder {0:?}")]
    UndefinedPlaceholder(String),

    #[error("step {0} exceeds its model's max_tokens")]
    MaxTokensExceeded(String),

    #[error("input text is empty")]
    EmptyInput,

    #[error(transparent)]
    Llm(#[from] pipeline_llm::LlmError),

    #[error(transparent)]
    Validation(#[from] pipeline_validation::ValidationError),

    #[error(transparent)]
    Store(#[from] pipeline_store::StoreError),
}

impl Classify for ExecutorError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExecutorError::UndefinedPlaceholder(_) => ErrorKind::PromptSubstitution,
            ExecutorError::MaxTokensExceeded(_) => ErrorKind::Validation,
            ExecutorError::EmptyInput => ErrorKind::Validation,
            ExecutorError::Llm(e) => e.kind(),
            ExecutorError::Validation(e) => e.kind(),
            ExecutorError::Store(e) => e.kind(),
        }
    }
}
