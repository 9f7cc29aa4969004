use std::time::Duration;

use pipeline_executor::ExecutionOutcome;

/// Per-job deadline and retry bounds (§4.G). Constructed from the
/// `JOB_DEADLINE_SECONDS` / `MAX_JOB_RETRIES` configuration keys at
/// process startup; defaults match the spec's own defaults.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub job_deadline: Duration,
    pub max_job_retries: i32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { job_deadline: Duration::from_secs(15 * 60), max_job_retries: 1 }
    }
}

/// What [`crate::worker::WorkerRuntime::run_job`] hands back to the
/// completion path: the executor's outcome plus the PII-cleaned text the
/// executor ran against, since that text (not the raw upload) is what
/// `Job.original_text` stores (§3: "original_text (PII-cleaned OCR)").
#[derive(Debug, Clone)]
pub struct JobRunResult {
    pub cleaned_text: String,
    pub outcome: ExecutionOutcome,
}
