//! Structured logging setup.
//!
//! One shared `tracing` subscriber used by every worker process. Verbose
//! mode adds the structured fields (`job_id`, `step`, `duration_ms`) that
//! the compact default omits.

use tracing::{Level, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initializes the global tracing subscriber.
///
/// Respects `PIPELINE_LOG` (standard `EnvFilter` syntax) if set; otherwise
/// falls back to `pipeline=debug,info` in verbose mode or `pipeline=info,warn`
/// by default.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_env("PIPELINE_LOG")
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("pipeline=debug,info")
            } else {
                EnvFilter::try_new("pipeline=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span covering one step's execution, carrying the fields every step log
/// line needs for correlation.
pub fn step_span(job_id: &str, step_name: &str, worker_id: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "step_execution",
        job_id = %job_id,
        step = %step_name,
        worker_id = %worker_id,
    )
}

pub fn log_step_start(job_id: &str, step_name: &str) {
    info!(job_id = %job_id, step = %step_name, "step starting");
}

pub fn log_step_complete(job_id: &str, step_name: &str, duration_ms: u64, cost_usd: f64) {
    info!(
        job_id = %job_id,
        step = %step_name,
        duration_ms = %duration_ms,
        cost_usd = %cost_usd,
        "step completed"
    );
}

/// Emits the single-line structured security event mandated by the prompt
/// guard contract: `SECURITY:PROMPT_INJECTION_DETECTED | processing_id=...
/// | step=... | severity=... | patterns=N`.
pub fn log_injection_detected(processing_id: &str, step_name: &str, severity: &str, patterns: usize) {
    warn!(
        "SECURITY:PROMPT_INJECTION_DETECTED | processing_id={processing_id} | step={step_name} | severity={severity} | patterns={patterns}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_span_carries_job_id() {
        let span = step_span("job-1", "Classification", "worker-0");
        assert_eq!(span.metadata().unwrap().name(), "step_execution");
    }
}
