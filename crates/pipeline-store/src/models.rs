//! Diesel records and the domain structs they convert to/from.
//!
//! Records mirror the SQLite column types directly (`String` timestamps,
//! `i32`/`i64` integers); the domain structs use the richer types
//! (`chrono::DateTime<Utc>`, enums) the rest of the crate works with.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{jobs, step_executions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    Terminated,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Timeout => "TIMEOUT",
            Self::Terminated => "TERMINATED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "QUEUED" => Some(Self::Queued),
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            "TIMEOUT" => Some(Self::Timeout),
            "TERMINATED" => Some(Self::Terminated),
            _ => None,
        }
    }

    /// True once the job will never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Timeout | Self::Terminated
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
    Terminated,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Terminated => "TERMINATED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "SKIPPED" => Some(Self::Skipped),
            "TERMINATED" => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// Row as stored: `file_content`, `original_text`, `simplified_text` and
/// `translated_text` hold ciphertext produced by [`crate::encryption`].
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = jobs)]
#[diesel(primary_key(job_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRecord {
    pub job_id: String,
    pub processing_id: String,
    pub lane: String,
    pub retry_count: i32,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_content: Vec<u8>,
    pub pipeline_config: String,
    pub ocr_config: String,
    pub target_language: Option<String>,
    pub document_class: Option<String>,
    pub status: String,
    pub progress_percent: i32,
    pub current_step: Option<String>,
    pub original_text: Option<Vec<u8>>,
    pub simplified_text: Option<Vec<u8>>,
    pub translated_text: Option<Vec<u8>>,
    pub result_data: Option<String>,
    pub error_message: Option<String>,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = jobs)]
pub struct NewJobRecord {
    pub job_id: String,
    pub processing_id: String,
    pub lane: String,
    pub retry_count: i32,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_content: Vec<u8>,
    pub pipeline_config: String,
    pub ocr_config: String,
    pub target_language: Option<String>,
    pub document_class: Option<String>,
    pub status: String,
    pub progress_percent: i32,
    pub current_step: Option<String>,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Decrypted, typed view of a job. This is what the executor and worker
/// runtime operate on; [`crate::repository::JobRepository`] handles the
/// encrypt/decrypt boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub processing_id: String,
    pub lane: String,
    pub retry_count: i32,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_content: Vec<u8>,
    pub pipeline_config: serde_json::Value,
    pub ocr_config: serde_json::Value,
    pub target_language: Option<String>,
    pub document_class: Option<String>,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub current_step: Option<String>,
    pub original_text: Option<String>,
    pub simplified_text: Option<String>,
    pub translated_text: Option<String>,
    pub result_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = step_executions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StepExecutionRecord {
    pub id: i32,
    pub job_id: String,
    pub step_name: String,
    pub step_order: i32,
    pub status: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub duration_ms: Option<i64>,
    pub input_text: Option<String>,
    pub output_text: Option<String>,
    pub error_message: Option<String>,
    pub model_used: Option<String>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub cost: Option<f64>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = step_executions)]
pub struct NewStepExecutionRecord {
    pub job_id: String,
    pub step_name: String,
    pub step_order: i32,
    pub status: String,
    pub started_at: Option<String>,
    pub input_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub id: i32,
    pub job_id: String,
    pub step_name: String,
    pub step_order: i32,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub input_text: Option<String>,
    pub output_text: Option<String>,
    pub error_message: Option<String>,
    pub model_used: Option<String>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiInteractionLog {
    pub id: i32,
    pub job_id: String,
    pub step_execution_id: Option<i32>,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost: f64,
    pub latency_ms: i64,
    pub success: bool,
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub order_in_phase: i32,
    pub document_class_id: Option<i32>,
    pub post_branching: bool,
    pub enabled: bool,
    pub is_branching_step: bool,
    pub model_id: i32,
    pub temperature: f64,
    pub max_tokens: i32,
    pub prompt_template: String,
    pub system_prompt: Option<String>,
    pub required_context_variables: Vec<String>,
    pub stop_on_values: Option<Vec<String>>,
    pub allowed_continue_tokens: Option<Vec<String>>,
    pub termination_reason: Option<String>,
    pub termination_message: Option<String>,
    pub retry_on_failure: bool,
    pub max_retries: i32,
    pub input_source: InputSource,
    pub output_format: OutputFormat,
    pub version: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    PreviousStepOutput,
    OriginalCleanedText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Markdown,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentClass {
    pub id: i32,
    pub class_key: String,
    pub display_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: i32,
    pub name: String,
    pub provider: String,
    pub input_price_per_million: f64,
    pub output_price_per_million: f64,
    pub max_tokens: i32,
    pub supports_vision: bool,
    pub supports_streaming: bool,
    pub active: bool,
}
