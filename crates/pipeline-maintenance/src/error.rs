use pipeline_utils::error::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("invalid cron expression {0:?}: {1}")]
    InvalidSchedule(String, String),

    #[error(transparent)]
    Store(#[from] pipeline_store::StoreError),
}

impl Classify for MaintenanceError {
    fn kind(&self) -> ErrorKind {
        match self {
            MaintenanceError::InvalidSchedule(..) => ErrorKind::Validation,
            MaintenanceError::Store(e) => e.kind(),
        }
    }
}
