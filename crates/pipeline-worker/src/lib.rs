//! Worker Runtime (component G): job state machine, deadline
//! enforcement, cooperative cancellation, and job-level retry via lane
//! demotion, wired around the Pipeline Executor.

pub mod error;
pub mod ocr;
pub mod types;
pub mod worker;

pub use error::WorkerError;
pub use ocr::{OcrClient, PlainTextOcr};
pub use types::{JobRunResult, WorkerSettings};
pub use worker::WorkerRuntime;
