//! Prompt Guard: sanitizes untrusted document text before it reaches an
//! LLM, detects injection attempts, and checks model output for leakage of
//! the trusted system prompt.

pub mod injection;
pub mod leakage;
pub mod sanitize;

pub use injection::{InjectionReport, Severity, detect_injection};
pub use leakage::detect_prompt_leakage;
pub use sanitize::sanitize_for_prompt;
