use std::time::Duration;

use pipeline_utils::error::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Executor(#[from] pipeline_executor::ExecutorError),

    #[error(transparent)]
    Store(#[from] pipeline_store::StoreError),

    #[error(transparent)]
    Queue(#[from] pipeline_queue::QueueError),

    #[error("OCR extraction unsupported for file_type {0:?}")]
    UnsupportedFileType(String),

    #[error("job deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("job cancelled externally")]
    Cancelled,
}

impl Classify for WorkerError {
    fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Executor(e) => e.kind(),
            WorkerError::Store(e) => e.kind(),
            WorkerError::Queue(e) => e.kind(),
            WorkerError::UnsupportedFileType(_) => ErrorKind::Validation,
            WorkerError::DeadlineExceeded(_) => ErrorKind::Timeout,
            WorkerError::Cancelled => ErrorKind::Cancellation,
        }
    }
}
