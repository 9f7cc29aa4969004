//! Applies a validated [`Bootstrap`] to the config tables. Idempotent:
//! re-running against an already-seeded store inserts nothing, since
//! `ConfigRepository::ensure_*` only inserts rows whose natural key
//! (model name, class key, step name) isn't already present.

use std::collections::HashMap;

use pipeline_store::config_repository::{NewDocumentClass, NewModel, NewPipelineStep};
use pipeline_store::ConfigRepository;

use crate::error::ConfigError;
use crate::model::{Bootstrap, InputSourceSpec, OutputFormatSpec};
use crate::validation::validate;

/// Seeds `bootstrap` into the store behind `config`, validating it first.
/// Returns the number of rows touched across all config tables (for
/// startup logging, not a correctness signal since inserts are
/// best-effort idempotent).
pub async fn seed(config: &ConfigRepository, bootstrap: &Bootstrap) -> Result<usize, ConfigError> {
    validate(bootstrap)?;

    let mut touched = 0usize;
    let mut model_ids: HashMap<&str, i32> = HashMap::new();
    for model in &bootstrap.models {
        let id = config
            .ensure_model(NewModel {
                name: model.name.clone(),
                provider: model.provider.clone(),
                input_price_per_million: model.input_price_per_million,
                output_price_per_million: model.output_price_per_million,
                max_tokens: model.max_tokens,
                supports_vision: model.supports_vision,
                supports_streaming: model.supports_streaming,
                active: model.active,
            })
            .await?;
        model_ids.insert(model.name.as_str(), id);
        touched += 1;
    }

    let mut class_ids: HashMap<&str, i32> = HashMap::new();
    for class in &bootstrap.document_classes {
        let id = config
            .ensure_document_class(NewDocumentClass {
                class_key: class.class_key.clone(),
                display_name: class.display_name.clone(),
                enabled: class.enabled,
            })
            .await?;
        class_ids.insert(class.class_key.as_str(), id);
        touched += 1;
    }

    for step in &bootstrap.steps {
        let model_id = *model_ids.get(step.model.as_str()).ok_or_else(|| ConfigError::InvalidValue {
            key: step.name.clone(),
            reason: format!("model {:?} not seeded", step.model),
        })?;
        let document_class_id =
            step.document_class.as_deref().and_then(|key| class_ids.get(key).copied());

        config
            .ensure_step(NewPipelineStep {
                name: step.name.clone(),
                description: step.description.clone(),
                order_in_phase: step.order_in_phase,
                document_class_id,
                post_branching: step.post_branching,
                enabled: step.enabled,
                is_branching_step: step.is_branching_step,
                model_id,
                temperature: step.temperature,
                max_tokens: step.max_tokens,
                prompt_template: step.prompt_template.clone(),
                system_prompt: step.system_prompt.clone(),
                required_context_variables: serde_json::to_string(&step.required_context_variables)
                    .expect("Vec<String> always serializes"),
                stop_on_values: step
                    .stop_on_values
                    .as_ref()
                    .map(|v| serde_json::to_string(v).expect("Vec<String> always serializes")),
                allowed_continue_tokens: step
                    .allowed_continue_tokens
                    .as_ref()
                    .map(|v| serde_json::to_string(v).expect("Vec<String> always serializes")),
                termination_reason: step.termination_reason.clone(),
                termination_message: step.termination_message.clone(),
                retry_on_failure: step.retry_on_failure,
                max_retries: step.max_retries,
                input_source: match step.input_source {
                    InputSourceSpec::PreviousStepOutput => "previous_step_output".to_string(),
                    InputSourceSpec::OriginalCleanedText => "original_cleaned_text".to_string(),
                },
                output_format: match step.output_format {
                    OutputFormatSpec::Text => "text".to_string(),
                    OutputFormatSpec::Markdown => "markdown".to_string(),
                    OutputFormatSpec::Json => "json".to_string(),
                },
                version: 1,
            })
            .await?;
        touched += 1;
    }

    for setting in &bootstrap.settings {
        config.set_setting(&setting.key, &setting.value, setting.is_encrypted).await?;
        touched += 1;
    }

    for flag in &bootstrap.feature_flags {
        config.set_feature_flag(&flag.name, flag.enabled).await?;
        touched += 1;
    }

    Ok(touched)
}
