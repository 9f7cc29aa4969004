//! Per-step execution protocol (§4.H steps 1–10).

use std::time::{Duration, Instant};

use pipeline_guard::{detect_injection, sanitize_for_prompt};
use pipeline_llm::{LlmBackend, LlmInvocation, Message};
use pipeline_store::models::{InputSource, StepStatus};
use pipeline_utils::error::Classify;
use pipeline_utils::logging::log_injection_detected;
use pipeline_validation::{ValidationRequest, validate_step_output};

use crate::error::ExecutorError;
use crate::template::substitute;
use crate::types::{ExecutionContext, ResolvedStep, StepOutcome, StepRecord};

const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct StepOutput {
    pub record: StepRecord,
    /// Set when the step's stop condition matched; the caller halts.
    pub matched_stop_value: Option<String>,
    /// Set when this is the branching step and a class token was read.
    pub branched_class_key: Option<String>,
}

/// Runs one step to completion (including its own `retry_on_failure`
/// loop), or returns a skip/failure record without ever calling the LLM.
pub async fn run_step(
    job_id: &str,
    resolved: &ResolvedStep,
    context: &ExecutionContext,
    original_text: &str,
    previous_output: &str,
    backend: &dyn LlmBackend,
) -> Result<StepOutput, ExecutorError> {
    let step = &resolved.step;

    // 1. Conditional skip.
    for required in &step.required_context_variables {
        if !context.has_nonempty(required) {
            return Ok(StepOutput {
                record: StepRecord {
                    step_name: step.name.clone(),
                    step_order: 0,
                    outcome: StepOutcome::Skipped,
                    output_text: None,
                    input_tokens: None,
                    output_tokens: None,
                    cost: None,
                    duration_ms: 0,
                    error_message: None,
                },
                matched_stop_value: None,
                branched_class_key: None,
            });
        }
    }

    if step.max_tokens > resolved.model_max_tokens {
        return Err(ExecutorError::MaxTokensExceeded(step.name.clone()));
    }

    let input_text = match resolved.input_source() {
        InputSource::PreviousStepOutput => previous_output,
        InputSource::OriginalCleanedText => original_text,
    };

    let started = Instant::now();
    let mut attempts = 0u32;
    let max_attempts = if step.retry_on_failure { step.max_retries as u32 + 1 } else { 1 };

    loop {
        attempts += 1;
        match try_once(job_id, resolved, context, input_text, backend).await {
            Ok(outcome) => {
                let duration_ms = started.elapsed().as_millis() as i64;
                return Ok(finalize(step, outcome, duration_ms));
            }
            Err(err) if err.kind().is_retryable() && attempts < max_attempts => {
                tracing::warn!(
                    job_id,
                    step = %step.name,
                    attempt = attempts,
                    error = %err,
                    "step failed, retrying"
                );
                continue;
            }
            Err(err) => return Err(err),
        }
    }
}

struct Attempt {
    output: String,
    input_tokens: u64,
    output_tokens: u64,
    cost: f64,
}

async fn try_once(
    job_id: &str,
    resolved: &ResolvedStep,
    context: &ExecutionContext,
    input_text: &str,
    backend: &dyn LlmBackend,
) -> Result<Attempt, ExecutorError> {
    let step = &resolved.step;

    // 2. Sanitize inputs + non-blocking injection detection.
    let injection_report = detect_injection(input_text);
    if !matches!(injection_report.severity, pipeline_guard::Severity::None) {
        log_injection_detected(
            job_id,
            &step.name,
            &injection_report.severity.to_string(),
            injection_report.detections.len(),
        );
    }

    let mut sanitized_ctx = context.clone();
    for key in ["original_text", "ocr_text", "target_language", "document_type"] {
        if let Some(value) = context.get(key) {
            let (clean, _) = sanitize_for_prompt(value);
            sanitized_ctx.set(key, clean);
        }
    }
    let (clean_input, _) = sanitize_for_prompt(input_text);
    sanitized_ctx.set("input_text", clean_input);

    // 3. Build messages.
    let user_content = substitute(&step.prompt_template, &sanitized_ctx)?;
    let mut messages = Vec::new();
    if let Some(system_prompt) = &step.system_prompt {
        messages.push(Message::system(system_prompt.clone()));
    }
    messages.push(Message::user(user_content));

    // 4. Invoke LLM.
    let invocation = LlmInvocation::new(
        job_id,
        step.name.clone(),
        resolved.model_name.clone(),
        step.temperature as f32,
        step.max_tokens as u32,
        DEFAULT_STEP_TIMEOUT,
        messages,
    );
    let result = backend.invoke(invocation).await?;

    // 5. Validate output. The expected-value check only applies to
    // classification-style steps (the branching step): a plain gate like
    // MedicalValidation has `stop_on_values` purely to recognize its own
    // termination phrase and must accept every other, non-terminating
    // output without complaint.
    let expected_values = if step.is_branching_step {
        step.stop_on_values.as_ref().map(|stop_values| {
            stop_values
                .iter()
                .chain(step.allowed_continue_tokens.iter().flatten())
                .cloned()
                .collect::<Vec<_>>()
        })
    } else {
        None
    };
    let request = ValidationRequest {
        output: &result.text,
        input_text,
        expected_values: expected_values.as_deref(),
        system_prompt: step.system_prompt.as_deref(),
    };
    let warnings = validate_step_output(&request)?;
    if warnings.length_ratio_anomaly {
        tracing::warn!(job_id, step = %step.name, "output length exceeds 10x input length");
    }

    let input_cost = result.input_tokens as f64 * resolved.input_price_per_million / 1_000_000.0;
    let output_cost = result.output_tokens as f64 * resolved.output_price_per_million / 1_000_000.0;

    Ok(Attempt {
        output: result.text,
        input_tokens: result.input_tokens,
        output_tokens: result.output_tokens,
        cost: input_cost + output_cost,
    })
}

fn finalize(step: &pipeline_store::models::PipelineStep, attempt: Attempt, duration_ms: i64) -> StepOutput {
    let matched_stop_value = step.stop_on_values.as_ref().and_then(|values| {
        let token = pipeline_validation::first_alphanumeric_token(&attempt.output)?;
        values.iter().find(|v| v.eq_ignore_ascii_case(&token)).cloned()
    });

    let branched_class_key = if step.is_branching_step {
        pipeline_validation::first_alphanumeric_token(&attempt.output).map(|t| t.to_uppercase())
    } else {
        None
    };

    StepOutput {
        record: StepRecord {
            step_name: step.name.clone(),
            step_order: 0,
            outcome: StepOutcome::Succeeded,
            output_text: Some(attempt.output),
            input_tokens: Some(attempt.input_tokens as i64),
            output_tokens: Some(attempt.output_tokens as i64),
            cost: Some(attempt.cost),
            duration_ms,
            error_message: None,
        },
        matched_stop_value,
        branched_class_key,
    }
}
