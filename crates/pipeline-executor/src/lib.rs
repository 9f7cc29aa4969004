//! Pipeline execution (component H): step ordering, the per-step
//! execution protocol, and the public `execute()` contract tying them
//! together against the guard/validation/llm/store crates.

pub mod error;
pub mod executor;
pub mod ordering;
pub mod step_exec;
pub mod template;
pub mod types;

pub use error::ExecutorError;
pub use executor::Executor;
pub use types::{ExecutionContext, ExecutionOutcome, ResolvedStep, StepOutcome, StepRecord, TerminationInfo};
