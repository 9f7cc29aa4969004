//! Pre-seed validation of a [`Bootstrap`] file, run before any row is
//! written so a malformed bootstrap fails atomically rather than leaving
//! the config tables half-seeded.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::model::Bootstrap;

pub fn validate(bootstrap: &Bootstrap) -> Result<(), ConfigError> {
    let mut model_names = HashSet::new();
    for model in &bootstrap.models {
        if !model_names.insert(model.name.as_str()) {
            return Err(invalid("models", format!("duplicate model name {:?}", model.name)));
        }
        if model.max_tokens <= 0 {
            return Err(invalid(&model.name, "max_tokens must be greater than 0"));
        }
        if model.input_price_per_million < 0.0 || model.output_price_per_million < 0.0 {
            return Err(invalid(&model.name, "prices must not be negative"));
        }
    }

    let mut class_keys = HashSet::new();
    for class in &bootstrap.document_classes {
        if !class_keys.insert(class.class_key.as_str()) {
            return Err(invalid("document_classes", format!("duplicate class_key {:?}", class.class_key)));
        }
    }

    let mut step_names = HashSet::new();
    for step in &bootstrap.steps {
        if !step_names.insert(step.name.as_str()) {
            return Err(invalid("steps", format!("duplicate step name {:?}", step.name)));
        }
        if !model_names.contains(step.model.as_str()) {
            return Err(invalid(&step.name, format!("references undefined model {:?}", step.model)));
        }
        if let Some(class) = &step.document_class {
            if !class_keys.contains(class.as_str()) {
                return Err(invalid(&step.name, format!("references undefined document class {:?}", class)));
            }
        }
        if !(0.0..=2.0).contains(&step.temperature) {
            return Err(invalid(&step.name, "temperature must be in [0.0, 2.0]"));
        }
        if step.max_tokens <= 0 {
            return Err(invalid(&step.name, "max_tokens must be greater than 0"));
        }
        if step.prompt_template.is_empty() {
            return Err(invalid(&step.name, "prompt_template must not be empty"));
        }
    }

    Ok(())
}

fn invalid(key: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue { key: key.into(), reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentClassSpec, ModelSpec, StepSpec};

    fn model(name: &str) -> ModelSpec {
        ModelSpec {
            name: name.to_string(),
            provider: "ovh".to_string(),
            input_price_per_million: 1.0,
            output_price_per_million: 2.0,
            max_tokens: 4096,
            supports_vision: false,
            supports_streaming: false,
            active: true,
        }
    }

    fn step(name: &str, model: &str) -> StepSpec {
        StepSpec {
            name: name.to_string(),
            description: String::new(),
            order_in_phase: 0,
            document_class: None,
            post_branching: false,
            enabled: true,
            is_branching_step: false,
            model: model.to_string(),
            temperature: 0.2,
            max_tokens: 512,
            prompt_template: "{input_text}".to_string(),
            system_prompt: None,
            required_context_variables: Vec::new(),
            stop_on_values: None,
            allowed_continue_tokens: None,
            termination_reason: None,
            termination_message: None,
            retry_on_failure: true,
            max_retries: 1,
            input_source: Default::default(),
            output_format: Default::default(),
        }
    }

    #[test]
    fn rejects_step_referencing_unknown_model() {
        let bootstrap = Bootstrap {
            models: vec![model("gpt")],
            document_classes: Vec::new(),
            steps: vec![step("s1", "unknown-model")],
            settings: Vec::new(),
            feature_flags: Vec::new(),
        };
        assert!(validate(&bootstrap).is_err());
    }

    #[test]
    fn rejects_step_referencing_unknown_class() {
        let mut s = step("s1", "gpt");
        s.document_class = Some("missing".to_string());
        let bootstrap = Bootstrap {
            models: vec![model("gpt")],
            document_classes: Vec::new(),
            steps: vec![s],
            settings: Vec::new(),
            feature_flags: Vec::new(),
        };
        assert!(validate(&bootstrap).is_err());
    }

    #[test]
    fn accepts_consistent_bootstrap() {
        let bootstrap = Bootstrap {
            models: vec![model("gpt")],
            document_classes: vec![DocumentClassSpec {
                class_key: "LAB_REPORT".to_string(),
                display_name: "Lab report".to_string(),
                enabled: true,
            }],
            steps: vec![step("s1", "gpt")],
            settings: Vec::new(),
            feature_flags: Vec::new(),
        };
        assert!(validate(&bootstrap).is_ok());
    }
}
