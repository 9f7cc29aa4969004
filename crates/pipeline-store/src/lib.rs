//! Job Store (component E) and Config Store read path (component A):
//! persistence for jobs, step executions, AI interaction logs and the
//! pipeline config tables, plus the opaque context surrogate (component
//! K) passed alongside a job.

pub mod config_repository;
pub mod context;
pub mod encryption;
pub mod error;
pub mod interaction_log;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod repository;
pub mod schema;

pub use config_repository::{ConfigRepository, NewDocumentClass, NewModel, NewPipelineStep};
pub use context::RequestContext;
pub use encryption::EncryptionKey;
pub use error::StoreError;
pub use interaction_log::InteractionLogRepository;
pub use pool::Pool;
pub use models::Job;
pub use repository::{JobRepository, StepExecutionRepository};
