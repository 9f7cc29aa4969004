//! Types shared by the ordering algorithm and the per-step protocol.

use std::collections::HashMap;

use pipeline_store::models::{InputSource, OutputFormat, PipelineStep};

/// `context` from the public contract: string keys to string values,
/// seeded with `original_text`/`ocr_text` and grown with `document_type`
/// and whatever extras a step's `required_context_variables` names.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn seeded(input_text: &str, target_language: Option<&str>) -> Self {
        let mut values = HashMap::new();
        values.insert("original_text".to_string(), input_text.to_string());
        values.insert("ocr_text".to_string(), input_text.to_string());
        if let Some(lang) = target_language {
            values.insert("target_language".to_string(), lang.to_string());
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn document_type(&self) -> Option<&str> {
        self.get("document_type")
    }

    pub fn has_nonempty(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.values
    }
}

/// Names the executor treats as optional: substituting the empty string
/// rather than failing the step if the placeholder is referenced but
/// unset (§4.H step 3).
pub const KNOWN_OPTIONAL_KEYS: &[&str] = &["target_language", "document_type"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Skipped,
    Failed,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step_name: String,
    pub step_order: i32,
    pub outcome: StepOutcome,
    pub output_text: Option<String>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub cost: Option<f64>,
    pub duration_ms: i64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TerminationInfo {
    pub termination_step: String,
    pub termination_reason: String,
    pub termination_message: String,
    pub matched_value: String,
}

/// Return value of the public contract `execute(job_id, input_text,
/// context) → (success, final_output, metadata)`.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub final_output: String,
    pub terminated: bool,
    pub termination: Option<TerminationInfo>,
    pub total_time_seconds: f64,
    pub steps_executed: Vec<StepRecord>,
    pub total_cost: f64,
    pub total_tokens: i64,
}

/// One fully-resolved step plus the model it's bound to, the unit the
/// ordering algorithm and the step executor both operate on.
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub step: PipelineStep,
    pub model_name: String,
    pub model_max_tokens: i32,
    pub input_price_per_million: f64,
    pub output_price_per_million: f64,
}

impl ResolvedStep {
    pub fn input_source(&self) -> InputSource {
        self.step.input_source
    }

    pub fn output_format(&self) -> OutputFormat {
        self.step.output_format
    }
}
