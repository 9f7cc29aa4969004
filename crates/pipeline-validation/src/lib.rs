//! Output validation for pipeline step results.
//!
//! Composes the three checks the per-step execution protocol runs after
//! every LLM invocation: expected-value match for classification-style
//! steps, a length-ratio anomaly warning, and system-prompt leakage.

use pipeline_guard::detect_prompt_leakage;
use pipeline_utils::error::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Output's first alphanumeric token wasn't in the expected set. Retryable.
    #[error("unexpected value: got {got:?}, expected one of {expected:?}")]
    UnexpectedValue { got: String, expected: Vec<String> },
    /// Output verbatim-quoted a window of the system prompt. Retryable.
    #[error("prompt leakage detected")]
    PromptLeakage,
    /// Output was empty. Retryable.
    #[error("output was empty")]
    EmptyOutput,
}

impl Classify for ValidationError {
    fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::UnexpectedValue { .. } => ErrorKind::OutputValidation,
            ValidationError::PromptLeakage => ErrorKind::OutputValidation,
            ValidationError::EmptyOutput => ErrorKind::OutputValidation,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationWarnings {
    pub length_ratio_anomaly: bool,
}

/// Extracts the first alphanumeric token from `text`, lowercased, matching
/// the "alphanumeric-token, case-insensitive" rule this spec mandates for
/// stop-word matching (as opposed to whitespace-splitting).
pub fn first_alphanumeric_token(text: &str) -> Option<String> {
    let mut token = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            token.push(c.to_ascii_lowercase());
        } else if !token.is_empty() {
            break;
        }
    }
    if token.is_empty() { None } else { Some(token) }
}

/// Parameters needed to validate one step's output. `expected_values` is
/// `None` for anything but the branching/classification step; callers
/// pass `stop_on_values ∪ allowed_continue_tokens` there and leave it
/// unset for a plain gate step (one that only uses `stop_on_values` to
/// recognize its own termination phrase, with every other output valid).
pub struct ValidationRequest<'a> {
    pub output: &'a str,
    pub input_text: &'a str,
    pub expected_values: Option<&'a [String]>,
    pub system_prompt: Option<&'a str>,
}

/// Runs all three checks. Returns `Ok(warnings)` if the output is
/// acceptable (possibly with a length-ratio warning), or `Err` on the
/// first retryable failure encountered, in the protocol's order:
/// expected-value, then leakage. Empty output is checked first since it
/// invalidates every other check.
pub fn validate_step_output(req: &ValidationRequest<'_>) -> Result<ValidationWarnings, ValidationError> {
    if req.output.is_empty() {
        return Err(ValidationError::EmptyOutput);
    }

    if let Some(expected) = req.expected_values {
        let token = first_alphanumeric_token(req.output).unwrap_or_default();
        let matches = expected.iter().any(|v| v.eq_ignore_ascii_case(&token));
        if !matches {
            return Err(ValidationError::UnexpectedValue {
                got: token,
                expected: expected.to_vec(),
            });
        }
    }

    if detect_prompt_leakage(req.output, req.system_prompt) {
        return Err(ValidationError::PromptLeakage);
    }

    let length_ratio_anomaly = req.output.chars().count() > 10 * req.input_text.chars().count().max(1);

    Ok(ValidationWarnings {
        length_ratio_anomaly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_fails_first() {
        let req = ValidationRequest {
            output: "",
            input_text: "anything",
            expected_values: Some(&["ARZTBRIEF".to_string()]),
            system_prompt: None,
        };
        assert_eq!(validate_step_output(&req), Err(ValidationError::EmptyOutput));
    }

    #[test]
    fn expected_value_match_is_case_insensitive() {
        let req = ValidationRequest {
            output: "arztbrief, weiterer Text",
            input_text: "input",
            expected_values: Some(&["ARZTBRIEF".to_string()]),
            system_prompt: None,
        };
        assert!(validate_step_output(&req).is_ok());
    }

    #[test]
    fn unexpected_value_is_retryable_error() {
        let req = ValidationRequest {
            output: "UNBEKANNT",
            input_text: "input",
            expected_values: Some(&["ARZTBRIEF".to_string(), "BEFUND".to_string()]),
            system_prompt: None,
        };
        assert!(matches!(
            validate_step_output(&req),
            Err(ValidationError::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn leakage_fails_after_expected_value_passes() {
        let system = "You are a careful medical translator assistant for patients";
        let req = ValidationRequest {
            output: "a careful medical translator assistant explains this",
            input_text: "input",
            expected_values: None,
            system_prompt: Some(system),
        };
        assert_eq!(validate_step_output(&req), Err(ValidationError::PromptLeakage));
    }

    #[test]
    fn length_ratio_anomaly_is_a_warning_not_a_failure() {
        let input = "short";
        let output = "x".repeat(100);
        let req = ValidationRequest {
            output: &output,
            input_text: input,
            expected_values: None,
            system_prompt: None,
        };
        let warnings = validate_step_output(&req).expect("should not fail");
        assert!(warnings.length_ratio_anomaly);
    }

    #[test]
    fn first_alphanumeric_token_skips_punctuation() {
        assert_eq!(
            first_alphanumeric_token("  \"ARZTBRIEF\", more text"),
            Some("arztbrief".to_string())
        );
    }
}
