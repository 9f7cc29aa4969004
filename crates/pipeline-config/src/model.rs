//! Deserialization shapes for a bootstrap TOML file describing the
//! initial model registry, document classes, and pipeline steps —
//! the data an operator hands this service before any job ever runs.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Bootstrap {
    #[serde(default)]
    pub models: Vec<ModelSpec>,
    #[serde(default)]
    pub document_classes: Vec<DocumentClassSpec>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub settings: Vec<SettingSpec>,
    #[serde(default)]
    pub feature_flags: Vec<FeatureFlagSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub input_price_per_million: f64,
    pub output_price_per_million: f64,
    pub max_tokens: i32,
    #[serde(default)]
    pub supports_vision: bool,
    #[serde(default)]
    pub supports_streaming: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentClassSpec {
    pub class_key: String,
    pub display_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order_in_phase: i32,
    #[serde(default)]
    pub document_class: Option<String>,
    #[serde(default)]
    pub post_branching: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub is_branching_step: bool,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    pub max_tokens: i32,
    pub prompt_template: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub required_context_variables: Vec<String>,
    #[serde(default)]
    pub stop_on_values: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_continue_tokens: Option<Vec<String>>,
    #[serde(default)]
    pub termination_reason: Option<String>,
    #[serde(default)]
    pub termination_message: Option<String>,
    #[serde(default = "default_true")]
    pub retry_on_failure: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    #[serde(default)]
    pub input_source: InputSourceSpec,
    #[serde(default)]
    pub output_format: OutputFormatSpec,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSourceSpec {
    #[default]
    PreviousStepOutput,
    OriginalCleanedText,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatSpec {
    #[default]
    Text,
    Markdown,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingSpec {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub is_encrypted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlagSpec {
    pub name: String,
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_retries() -> i32 {
    1
}
