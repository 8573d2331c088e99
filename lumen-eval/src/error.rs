//! Error types for metric evaluation

use lumen_core::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for evaluation operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur during evaluation
#[derive(Error, Debug)]
pub enum EvalError {
    /// Request failed validation before any work was done
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// Heuristic or model configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Regex pattern did not compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// No evaluator handles this metric kind
    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    /// The judge provider failed, timed out, or could not be reached
    #[error("Evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    /// The judge answered, but not with a usable verdict
    #[error("Malformed judge response: {message}")]
    MalformedJudgeResponse { message: String, raw: String },

    /// Storage failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

fn join_fields(fields: &[FieldError]) -> String {
    fields.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl EvalError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn malformed(message: impl Into<String>, raw: impl Into<String>) -> Self {
        EvalError::MalformedJudgeResponse { message: message.into(), raw: raw.into() }
    }

    /// Stable name of the variant, used in logs and API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Validation(_) => "validation",
            EvalError::InvalidConfig(_) => "invalid_config",
            EvalError::InvalidPattern(_) => "invalid_pattern",
            EvalError::UnsupportedMetric(_) => "unsupported_metric",
            EvalError::EvaluatorUnavailable(_) => "evaluator_unavailable",
            EvalError::MalformedJudgeResponse { .. } => "malformed_judge_response",
            EvalError::Persistence(_) => "persistence",
            EvalError::NotFound(_) => "not_found",
            EvalError::Conflict(_) => "conflict",
        }
    }
}

impl From<ProviderError> for EvalError {
    fn from(err: ProviderError) -> Self {
        if err.is_config() {
            EvalError::InvalidConfig(err.to_string())
        } else {
            EvalError::EvaluatorUnavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = EvalError::Validation(vec![
            FieldError::new("input", "must not be empty"),
            FieldError::new("output", "is required"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: input: must not be empty; output: is required"
        );
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_provider_error_mapping() {
        let err: EvalError = ProviderError::Status { status: 503, body: "busy".into() }.into();
        assert!(matches!(err, EvalError::EvaluatorUnavailable(_)));

        let err: EvalError = ProviderError::Config("missing key".into()).into();
        assert!(matches!(err, EvalError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_keeps_raw() {
        let err = EvalError::malformed("no score", "I think it is fine");
        match err {
            EvalError::MalformedJudgeResponse { raw, .. } => assert_eq!(raw, "I think it is fine"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
