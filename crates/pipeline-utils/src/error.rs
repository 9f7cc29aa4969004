//! Shared error classification.
//!
//! Every crate defines its own `thiserror` error enum for its domain; each
//! maps into this classification so the worker runtime can apply one
//! uniform retry/propagation policy regardless of which layer raised the
//! error.

use std::fmt;

/// The nine error kinds from the error-handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input violates the job schema. Surfaced to the caller, never retried.
    Validation,
    /// Network failure talking to an LLM or PII provider. Retryable with backoff.
    TransientTransport,
    /// Credential rejection. Fatal, should alert.
    AuthFailure,
    /// Provider throttling. Retryable on a longer backoff.
    QuotaExceeded,
    /// A step's prompt template referenced an undefined placeholder. Fatal.
    PromptSubstitution,
    /// Expected-value, leakage, or empty-output check failed. Retryable per step policy.
    OutputValidation,
    /// Not an error: a step's stop condition fired.
    Termination,
    /// Per-step or per-job deadline exceeded. Fatal for the job.
    Timeout,
    /// External cancellation. Fatal for the job.
    Cancellation,
}

impl ErrorKind {
    /// Whether the worker runtime's own retry loop (as opposed to a step's
    /// internal retry policy) may ever re-attempt work of this kind.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::TransientTransport | ErrorKind::QuotaExceeded | ErrorKind::OutputValidation
        )
    }

    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::AuthFailure
                | ErrorKind::PromptSubstitution
                | ErrorKind::Timeout
                | ErrorKind::Cancellation
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::TransientTransport => "transient_transport",
            ErrorKind::AuthFailure => "auth_failure",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::PromptSubstitution => "prompt_substitution",
            ErrorKind::OutputValidation => "output_validation",
            ErrorKind::Termination => "termination",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancellation => "cancellation",
        };
        write!(f, "{s}")
    }
}

/// Implemented by each crate's domain error enum so the worker runtime can
/// classify any error into the shared taxonomy without matching concrete
/// types across crate boundaries.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_are_retryable() {
        assert!(ErrorKind::TransientTransport.is_retryable());
        assert!(ErrorKind::QuotaExceeded.is_retryable());
        assert!(ErrorKind::OutputValidation.is_retryable());
        assert!(!ErrorKind::PromptSubstitution.is_retryable());
    }

    #[test]
    fn auth_and_substitution_never_retry() {
        assert!(ErrorKind::AuthFailure.is_fatal());
        assert!(ErrorKind::PromptSubstitution.is_fatal());
        assert!(!ErrorKind::TransientTransport.is_fatal());
    }
}
