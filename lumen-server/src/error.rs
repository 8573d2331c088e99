//! Error responses for the HTTP API.
//!
//! [`status_for`] is the one place an [`EvalError`] kind becomes an HTTP
//! status. Every error body is `{success: false, error, details?}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lumen_eval::{EvalError, FieldError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

const VALIDATION_MESSAGE: &str = "Validation failed";
const UPSTREAM_MESSAGE: &str = "Evaluation provider unavailable";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// HTTP status for each error kind.
pub fn status_for(error: &EvalError) -> StatusCode {
    match error {
        EvalError::Validation(_) | EvalError::UnsupportedMetric(_) => StatusCode::BAD_REQUEST,
        EvalError::InvalidConfig(_) | EvalError::InvalidPattern(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EvalError::NotFound(_) => StatusCode::NOT_FOUND,
        EvalError::Conflict(_) => StatusCode::CONFLICT,
        EvalError::EvaluatorUnavailable(_) | EvalError::MalformedJudgeResponse { .. } => {
            StatusCode::BAD_GATEWAY
        }
        EvalError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// An [`EvalError`] on its way to the client.
///
/// Server-side failures (5xx) are reported with a generic message unless
/// `expose_details` is set.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ApiError {
    source: EvalError,
    expose_details: bool,
}

impl ApiError {
    pub fn new(source: EvalError) -> Self {
        Self { source, expose_details: false }
    }

    pub fn with_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.source)
    }

    pub fn inner(&self) -> &EvalError {
        &self.source
    }

    /// The `error` string shown to clients.
    pub fn message(&self) -> String {
        match &self.source {
            EvalError::Validation(_) => VALIDATION_MESSAGE.to_string(),
            e if self.status().is_server_error() && !self.expose_details => {
                match e {
                    EvalError::EvaluatorUnavailable(_) | EvalError::MalformedJudgeResponse { .. } => {
                        UPSTREAM_MESSAGE.to_string()
                    }
                    _ => INTERNAL_MESSAGE.to_string(),
                }
            }
            e => e.to_string(),
        }
    }

    pub fn details(&self) -> Option<Value> {
        match &self.source {
            EvalError::Validation(fields) => serde_json::to_value(fields).ok(),
            EvalError::MalformedJudgeResponse { raw, .. } if self.expose_details => {
                Some(serde_json::json!({ "raw": raw }))
            }
            _ => None,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { success: false, error: self.message(), details: self.details() }
    }
}

impl From<EvalError> for ApiError {
    fn from(source: EvalError) -> Self {
        Self::new(source)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(EvalError::Validation(vec![FieldError::new("body", rejection.body_text())]))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(EvalError::Validation(vec![FieldError::new("query", rejection.body_text())]))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(EvalError::Validation(vec![FieldError::new("path", rejection.body_text())]))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error.kind = self.source.kind(), error = %self.source, "request failed");
        } else {
            tracing::debug!(error.kind = self.source.kind(), error = %self.source, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
