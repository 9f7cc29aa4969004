//! Public contract (§4.H): `execute(job_id, input_text, context) →
//! (success, final_output, metadata)`.

use std::time::Instant;

use pipeline_llm::LlmBackend;
use pipeline_store::models::{Model, PipelineStep, StepStatus};
use pipeline_store::{ConfigRepository, InteractionLogRepository, StepExecutionRepository};

use crate::error::ExecutorError;
use crate::ordering::{phase_one, phase_three, phase_two};
use crate::step_exec::run_step;
use crate::types::{ExecutionContext, ExecutionOutcome, ResolvedStep, StepOutcome, TerminationInfo};

pub struct Executor<'a> {
    config: &'a ConfigRepository,
    step_log: &'a StepExecutionRepository,
    interaction_log: &'a InteractionLogRepository,
    backend: &'a dyn LlmBackend,
}

impl<'a> Executor<'a> {
    pub fn new(
        config: &'a ConfigRepository,
        step_log: &'a StepExecutionRepository,
        interaction_log: &'a InteractionLogRepository,
        backend: &'a dyn LlmBackend,
    ) -> Self {
        Self { config, step_log, interaction_log, backend }
    }

    pub async fn execute(
        &self,
        job_id: &str,
        input_text: &str,
        target_language: Option<&str>,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        if input_text.is_empty() {
            return Err(ExecutorError::EmptyInput);
        }

        let started = Instant::now();
        let mut context = ExecutionContext::seeded(input_text, target_language);

        let all_steps = self.config.enabled_steps().await?;
        let classes = self.config.document_classes().await?;
        let models = self.config.active_models().await?;

        let mut steps_executed = Vec::new();
        let mut total_cost = 0.0;
        let mut total_tokens: i64 = 0;
        let mut current_output = input_text.to_string();
        let mut global_order = 0i32;

        macro_rules! run_phase {
            ($phase_steps:expr) => {
                for step in $phase_steps {
                    let resolved = resolve(&step, &models)?;
                    let record = self
                        .run_and_persist(job_id, &resolved, &context, input_text, &current_output, global_order)
                        .await?;
                    global_order += 1;

                    total_cost += record.record.cost.unwrap_or(0.0);
                    total_tokens += record.record.input_tokens.unwrap_or(0) + record.record.output_tokens.unwrap_or(0);

                    match record.record.outcome {
                        StepOutcome::Skipped => {
                            steps_executed.push(record.record);
                            continue;
                        }
                        StepOutcome::Succeeded => {
                            if let Some(output) = &record.record.output_text {
                                current_output = output.clone();
                            }
                            if let Some(class_key) = &record.branched_class_key {
                                if classes.iter().any(|c| &c.class_key == class_key && c.enabled) {
                                    context.set("document_type", class_key.clone());
                                }
                                // Unmatched token: document_type stays unset and phase 2 is
                                // simply empty, per the branching side-effect fallback.
                            }
                            if let Some(matched) = record.matched_stop_value {
                                let info = TerminationInfo {
                                    termination_step: step.name.clone(),
                                    termination_reason: step
                                        .termination_reason
                                        .clone()
                                        .unwrap_or_default(),
                                    termination_message: step
                                        .termination_message
                                        .clone()
                                        .unwrap_or_default(),
                                    matched_value: matched,
                                };
                                steps_executed.push(record.record);
                                return Ok(ExecutionOutcome {
                                    success: true,
                                    final_output: current_output,
                                    terminated: true,
                                    termination: Some(info),
                                    total_time_seconds: started.elapsed().as_secs_f64(),
                                    steps_executed,
                                    total_cost,
                                    total_tokens,
                                });
                            }
                            steps_executed.push(record.record);
                        }
                        StepOutcome::Failed | StepOutcome::Terminated => {
                            steps_executed.push(record.record);
                            return Ok(ExecutionOutcome {
                                success: false,
                                final_output: current_output,
                                terminated: false,
                                termination: None,
                                total_time_seconds: started.elapsed().as_secs_f64(),
                                steps_executed,
                                total_cost,
                                total_tokens,
                            });
                        }
                    }
                }
            };
        }

        run_phase!(phase_one(&all_steps));

        let selected_class_id = context
            .document_type()
            .and_then(|key| classes.iter().find(|c| c.class_key == key))
            .map(|c| c.id);
        run_phase!(phase_two(&all_steps, selected_class_id));

        run_phase!(phase_three(&all_steps));

        Ok(ExecutionOutcome {
            success: true,
            final_output: current_output,
            terminated: false,
            termination: None,
            total_time_seconds: started.elapsed().as_secs_f64(),
            steps_executed,
            total_cost,
            total_tokens,
        })
    }

    async fn run_and_persist(
        &self,
        job_id: &str,
        resolved: &ResolvedStep,
        context: &ExecutionContext,
        original_text: &str,
        previous_output: &str,
        global_order: i32,
    ) -> Result<crate::step_exec::StepOutput, ExecutorError> {
        let step_name = resolved.step.name.clone();
        let row_id = self
            .step_log
            .start(job_id, &step_name, global_order, Some(previous_output))
            .await?;

        let outcome = run_step(job_id, resolved, context, original_text, previous_output, self.backend).await;

        let mut output = match outcome {
            Ok(output) => output,
            Err(err) => {
                self.step_log
                    .finish(row_id, StepStatus::Failed, None, Some(&err.to_string()), None, None, None, None, 0)
                    .await?;
                return Err(err);
            }
        };
        output.record.step_order = global_order;

        let status = match output.record.outcome {
            StepOutcome::Succeeded => StepStatus::Succeeded,
            StepOutcome::Skipped => StepStatus::Skipped,
            StepOutcome::Failed => StepStatus::Failed,
            StepOutcome::Terminated => StepStatus::Terminated,
        };

        self.step_log
            .finish(
                row_id,
                status,
                output.record.output_text.as_deref(),
                output.record.error_message.as_deref(),
                Some(&resolved.model_name),
                output.record.input_tokens,
                output.record.output_tokens,
                output.record.cost,
                output.record.duration_ms,
            )
            .await?;

        if matches!(output.record.outcome, StepOutcome::Succeeded) {
            self.interaction_log
                .record(
                    job_id,
                    Some(row_id),
                    &resolved.model_name,
                    output.record.input_tokens.unwrap_or(0),
                    output.record.output_tokens.unwrap_or(0),
                    output.record.cost.unwrap_or(0.0),
                    output.record.duration_ms,
                    true,
                    None,
                )
                .await?;
        }

        Ok(output)
    }
}

fn resolve(step: &PipelineStep, models: &[Model]) -> Result<ResolvedStep, ExecutorError> {
    let model = models
        .iter()
        .find(|m| m.id == step.model_id)
        .ok_or_else(|| ExecutorError::MaxTokensExceeded(step.name.clone()))?;
    if step.max_tokens > model.max_tokens {
        return Err(ExecutorError::MaxTokensExceeded(step.name.clone()));
    }
    Ok(ResolvedStep {
        step: step.clone(),
        model_name: model.name.clone(),
        model_max_tokens: model.max_tokens,
        input_price_per_million: model.input_price_per_million,
        output_price_per_million: model.output_price_per_million,
    })
}
