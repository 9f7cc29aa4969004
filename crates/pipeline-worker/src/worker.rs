//! Worker Runtime (component G): drains the priority queue, loads each
//! job, advances it through OCR → Privacy Filter → Pipeline Executor, and
//! persists the outcome against the job state machine (§4.G). Grounded on
//! `monokrome-foiacquire`'s download worker loop (claim → process →
//! continue, one `tokio::spawn`ed task per worker slot).

use std::sync::Arc;
use std::time::Instant;

use pipeline_executor::{Executor, ExecutionOutcome};
use pipeline_llm::LlmBackend;
use pipeline_privacy::PrivacyFilterClient;
use pipeline_queue::{Dispatcher, Lane};
use pipeline_store::models::{Job, JobStatus};
use pipeline_store::{ConfigRepository, InteractionLogRepository, JobRepository, StepExecutionRepository};
use pipeline_utils::error::Classify;
use tokio::time::{sleep, timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::WorkerError;
use crate::ocr::OcrClient;
use crate::types::{JobRunResult, WorkerSettings};

const DEQUEUE_RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub struct WorkerRuntime {
    dispatcher: Arc<Dispatcher>,
    jobs: Arc<JobRepository>,
    config: Arc<ConfigRepository>,
    step_log: Arc<StepExecutionRepository>,
    interaction_log: Arc<InteractionLogRepository>,
    backend: Arc<dyn LlmBackend>,
    ocr: Arc<dyn OcrClient>,
    privacy: Option<Arc<PrivacyFilterClient>>,
    settings: WorkerSettings,
}

impl WorkerRuntime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        jobs: Arc<JobRepository>,
        config: Arc<ConfigRepository>,
        step_log: Arc<StepExecutionRepository>,
        interaction_log: Arc<InteractionLogRepository>,
        backend: Arc<dyn LlmBackend>,
        ocr: Arc<dyn OcrClient>,
        privacy: Option<Arc<PrivacyFilterClient>>,
        settings: WorkerSettings,
    ) -> Self {
        Self { dispatcher, jobs, config, step_log, interaction_log, backend, ocr, privacy, settings }
    }

    /// Drains the queue into this worker slot until `cancel` fires.
    /// Intended to be run inside `tokio::spawn`, one call per concurrency
    /// slot (`WORKER_CONCURRENCY` per process, §5).
    pub async fn run(&self, worker_id: &str, cancel: CancellationToken) {
        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => break,
                claimed = self.dispatcher.dequeue(worker_id) => match claimed {
                    Ok(job) => job,
                    Err(e) => {
                        warn!(worker_id, error = %e, "dequeue failed, retrying");
                        sleep(DEQUEUE_RETRY_BACKOFF).await;
                        continue;
                    }
                },
            };

            self.process_job(worker_id, job, &cancel).await;
            self.dispatcher.release(worker_id).await;
        }
    }

    async fn process_job(&self, worker_id: &str, job: Job, cancel: &CancellationToken) {
        let job_id = job.job_id.clone();
        info!(worker_id, job_id = %job_id, lane = %job.lane, "job claimed");
        let started = Instant::now();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                self.finish_cancelled(&job_id).await;
                info!(worker_id, job_id = %job_id, "job cancelled");
                return;
            }
            result = timeout(self.settings.job_deadline, self.run_job(&job)) => result,
        };

        match outcome {
            Ok(Ok(run)) => self.finish_success(&job, run).await,
            Ok(Err(err)) => self.finish_failure(&job, err).await,
            Err(_elapsed) => self.finish_timeout(&job_id).await,
        }

        info!(
            worker_id,
            job_id = %job_id,
            duration_ms = %started.elapsed().as_millis(),
            "job settled"
        );
    }

    /// OCR → Privacy Filter → Pipeline Executor, in that order (§2 flow
    /// diagram). Deadline enforcement wraps this whole call from
    /// `process_job`, not just the executor, since a stuck OCR or privacy
    /// call must also preempt.
    async fn run_job(&self, job: &Job) -> Result<JobRunResult, WorkerError> {
        let raw_text = self.ocr.extract_text(&job.file_content, &job.file_type).await?;
        self.jobs.update_progress(&job.job_id, 5, Some("ocr")).await?;

        let cleaned_text = match &self.privacy {
            Some(privacy) => {
                let language = job.target_language.as_deref().unwrap_or("de");
                let result = privacy.remove_pii(&raw_text, language, &[]).await;
                if result.degraded {
                    warn!(job_id = %job.job_id, "privacy filter degraded to local fallback");
                }
                result.cleaned_text
            }
            None => raw_text,
        };
        self.jobs.update_progress(&job.job_id, 15, Some("privacy_filter")).await?;

        let executor =
            Executor::new(&self.config, &self.step_log, &self.interaction_log, self.backend.as_ref());
        let outcome = executor.execute(&job.job_id, &cleaned_text, job.target_language.as_deref()).await?;

        Ok(JobRunResult { cleaned_text, outcome })
    }

    async fn finish_success(&self, job: &Job, run: JobRunResult) {
        let JobRunResult { cleaned_text, outcome } = run;
        let ExecutionOutcome { success, final_output, terminated, termination, steps_executed, total_cost, total_tokens, total_time_seconds } = outcome;

        let status = if terminated {
            JobStatus::Terminated
        } else if success {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };

        let result_data = serde_json::json!({
            "steps_executed": steps_executed.iter().map(|s| serde_json::json!({
                "step_name": s.step_name,
                "step_order": s.step_order,
                "outcome": format!("{:?}", s.outcome),
                "duration_ms": s.duration_ms,
            })).collect::<Vec<_>>(),
            "termination": termination.as_ref().map(|t| serde_json::json!({
                "termination_step": t.termination_step,
                "termination_reason": t.termination_reason,
                "termination_message": t.termination_message,
                "matched_value": t.matched_value,
            })),
            "total_time_seconds": total_time_seconds,
        });

        let error_message =
            if success { None } else { Some("pipeline execution did not complete successfully".to_string()) };

        if let Err(e) = self
            .jobs
            .complete(
                &job.job_id,
                status,
                Some(&cleaned_text),
                Some(&final_output),
                None,
                Some(&result_data),
                error_message.as_deref(),
            )
            .await
        {
            warn!(job_id = %job.job_id, error = %e, "failed to persist job completion");
        }

        if let Err(e) = self.jobs.accrue_cost(&job.job_id, total_tokens, total_cost).await {
            warn!(job_id = %job.job_id, error = %e, "failed to persist cost accrual");
        }
    }

    /// Classifies the error and either requeues the job at a demoted lane
    /// (bounded by `max_job_retries`, §4.G) or marks it FAILED.
    async fn finish_failure(&self, job: &Job, err: WorkerError) {
        let kind = err.kind();

        if should_retry(kind, job.retry_count, self.settings.max_job_retries) {
            let current_lane = Lane::from_str(&job.lane).unwrap_or(Lane::Default);
            let new_lane = current_lane.demoted();
            match self.dispatcher.requeue(&job.job_id, new_lane).await {
                Ok(true) => {
                    info!(
                        job_id = %job.job_id,
                        from_lane = %current_lane,
                        to_lane = %new_lane,
                        retry_count = job.retry_count + 1,
                        "requeued after retryable failure"
                    );
                    return;
                }
                Ok(false) => {
                    // Job was no longer RUNNING (another worker already settled it).
                }
                Err(e) => warn!(job_id = %job.job_id, error = %e, "requeue failed, marking FAILED"),
            }
        }

        if let Err(e) = self
            .jobs
            .complete(&job.job_id, JobStatus::Failed, None, None, None, None, Some(&err.to_string()))
            .await
        {
            warn!(job_id = %job.job_id, error = %e, "failed to persist job failure");
        }
    }

    async fn finish_timeout(&self, job_id: &str) {
        if let Err(e) = self
            .jobs
            .complete(job_id, JobStatus::Timeout, None, None, None, None, Some("job deadline exceeded"))
            .await
        {
            warn!(job_id, error = %e, "failed to persist job timeout");
        }
    }

    async fn finish_cancelled(&self, job_id: &str) {
        if let Err(e) = self
            .jobs
            .complete(job_id, JobStatus::Cancelled, None, None, None, None, Some("cancelled externally"))
            .await
        {
            warn!(job_id, error = %e, "failed to persist job cancellation");
        }
    }
}

/// Whether a job-level retry should be attempted for an error of `kind`,
/// given how many times this job has already been retried (§4.G: "bounded
/// by `max_job_retries`").
fn should_retry(kind: pipeline_utils::error::ErrorKind, retry_count: i32, max_job_retries: i32) -> bool {
    kind.is_retryable() && retry_count < max_job_retries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_utils::error::ErrorKind;

    #[test]
    fn retries_transient_failures_under_the_bound() {
        assert!(should_retry(ErrorKind::TransientTransport, 0, 1));
        assert!(!should_retry(ErrorKind::TransientTransport, 1, 1));
    }

    #[test]
    fn never_retries_fatal_kinds_regardless_of_count() {
        assert!(!should_retry(ErrorKind::PromptSubstitution, 0, 5));
        assert!(!should_retry(ErrorKind::AuthFailure, 0, 5));
    }

    #[test]
    fn lane_demotion_on_retry_never_escalates_priority() {
        let lane = Lane::from_str("high_priority").unwrap();
        assert_eq!(lane.demoted(), Lane::Default);
    }
}
