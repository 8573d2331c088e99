use axum::extract::{Query, State, rejection::QueryRejection};
use lumen_eval::{
    BatchItem, Correlation, DEFAULT_BATCH_CONCURRENCY, EvalError, EvaluationRecord,
    EvaluationRequest, EvaluationResult, Evaluator, FieldError, HeuristicConfig, MetricKind,
    RecordQuery,
};
use lumen_model::ModelConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::ServerConfig;
use crate::error::ApiError;
use crate::rest::response::{ApiJson, ApiResponse};

/// Largest accepted batch.
pub const MAX_BATCH_ITEMS: usize = 100;

#[derive(Clone)]
pub struct MetricsController {
    evaluator: Evaluator,
    expose_error_details: bool,
}

impl MetricsController {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            evaluator: config.evaluator,
            expose_error_details: config.security.expose_error_details,
        }
    }

    fn fail(&self, error: EvalError) -> ApiError {
        ApiError::new(error).with_details(self.expose_error_details)
    }
}

/// Body of `POST /api/metrics/evaluate`. Every field is optional here so
/// missing ones are reported together as a validation failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateBody {
    pub input: Option<String>,
    pub output: Option<String>,
    #[serde(default)]
    pub context: Vec<String>,
    pub reference: Option<String>,
    pub metric_type: Option<String>,
    pub model: Option<ModelConfig>,
    pub custom_prompt: Option<String>,
    /// Config fields for heuristic metric types, e.g. `{"pattern": "^a", "flags": "i"}`.
    pub heuristic_config: Option<Value>,
    pub timeout_ms: Option<u64>,
    pub trace_id: Option<String>,
    pub experiment_id: Option<String>,
}

fn metric_type_hint() -> String {
    let names: Vec<_> = MetricKind::ALL.iter().map(|k| k.as_str()).collect();
    format!("must be one of: {}", names.join(", "))
}

impl EvaluateBody {
    /// Field checks that need no evaluator. Judge-specific checks (blank
    /// input or output) are left to [`Evaluator::validate`].
    pub fn into_request(self) -> Result<(EvaluationRequest, Correlation), EvalError> {
        let mut errors = Vec::new();

        let kind = match self.metric_type.as_deref() {
            None => {
                errors.push(FieldError::new("metricType", "is required"));
                None
            }
            Some(name) => match name.parse::<MetricKind>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    errors.push(FieldError::new("metricType", metric_type_hint()));
                    None
                }
            },
        };
        if self.output.is_none() {
            errors.push(FieldError::new("output", "is required"));
        }
        if kind.is_some_and(|k| k.is_judge_backed()) && self.input.is_none() {
            errors.push(FieldError::new("input", "is required"));
        }
        if self.timeout_ms == Some(0) {
            errors.push(FieldError::new("timeoutMs", "must be greater than 0"));
        }

        let heuristic = kind.and_then(|k| k.heuristic_kind());
        if heuristic.is_none() && self.heuristic_config.is_some() {
            errors.push(FieldError::new(
                "heuristicConfig",
                "only applies to heuristic metric types",
            ));
        }

        let (Some(kind), Some(output), true) = (kind, self.output, errors.is_empty()) else {
            return Err(EvalError::Validation(errors));
        };

        let mut request = EvaluationRequest::new(kind, self.input.unwrap_or_default(), output)
            .with_context(self.context);
        request.reference = self.reference;
        request.model_config = self.model;
        request.custom_prompt = self.custom_prompt;
        request.timeout = self.timeout_ms.map(Duration::from_millis);
        if let (Some(heuristic), Some(config)) = (heuristic, self.heuristic_config) {
            request.heuristic_config = Some(HeuristicConfig::from_parts(heuristic, config)?);
        }

        Ok((request, Correlation::new(self.trace_id, self.experiment_id)))
    }
}

pub async fn evaluate(
    State(controller): State<MetricsController>,
    ApiJson(body): ApiJson<EvaluateBody>,
) -> Result<ApiResponse<EvaluationResult>, ApiError> {
    let (request, correlation) = body.into_request().map_err(|e| controller.fail(e))?;
    let result = controller
        .evaluator
        .evaluate_and_record(&request, &correlation)
        .await
        .map_err(|e| controller.fail(e))?;
    Ok(ApiResponse::ok(result))
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub items: Vec<EvaluateBody>,
    pub concurrency: Option<usize>,
}

/// Per-item outcome in a batch response.
#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl BatchEntry {
    fn from_result(result: Result<EvaluationResult, ApiError>) -> Self {
        match result {
            Ok(data) => Self { success: true, data: Some(data), error: None, details: None },
            Err(e) => {
                let body = e.body();
                Self { success: false, data: None, error: Some(body.error), details: body.details }
            }
        }
    }
}

pub async fn evaluate_batch(
    State(controller): State<MetricsController>,
    ApiJson(body): ApiJson<BatchBody>,
) -> Result<ApiResponse<Vec<BatchEntry>>, ApiError> {
    if body.items.is_empty() {
        return Err(controller.fail(EvalError::validation("items", "must not be empty")));
    }
    if body.items.len() > MAX_BATCH_ITEMS {
        return Err(controller.fail(EvalError::validation(
            "items",
            format!("must contain at most {MAX_BATCH_ITEMS} entries"),
        )));
    }

    // Items that fail field checks keep their slot; the rest are evaluated together.
    let mut slots: Vec<Option<Result<EvaluationResult, ApiError>>> = Vec::new();
    let mut valid = Vec::new();
    for item in body.items {
        match item.into_request() {
            Ok((request, correlation)) => {
                slots.push(None);
                valid.push(BatchItem { request, correlation });
            }
            Err(e) => slots.push(Some(Err(controller.fail(e)))),
        }
    }

    let concurrency = body.concurrency.unwrap_or(DEFAULT_BATCH_CONCURRENCY);
    let mut evaluated = controller.evaluator.evaluate_batch(valid, concurrency).await.into_iter();

    let entries = slots
        .into_iter()
        .map(|slot| match slot {
            Some(rejected) => BatchEntry::from_result(rejected),
            None => BatchEntry::from_result(match evaluated.next() {
                Some(result) => result.map_err(|e| controller.fail(e)),
                None => Err(controller.fail(EvalError::Persistence(
                    "batch result missing".to_string(),
                ))),
            }),
        })
        .collect();

    Ok(ApiResponse::ok(entries))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsParams {
    pub trace_id: Option<String>,
    pub experiment_id: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_results(
    State(controller): State<MetricsController>,
    params: Result<Query<ResultsParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<EvaluationRecord>>, ApiError> {
    let Query(params) = params?;
    let Some(sink) = controller.evaluator.sink() else {
        return Ok(ApiResponse::ok(Vec::new()));
    };

    let mut query = RecordQuery::default();
    if let Some(id) = params.trace_id.filter(|s| !s.trim().is_empty()) {
        query = query.with_trace_id(id);
    }
    if let Some(id) = params.experiment_id.filter(|s| !s.trim().is_empty()) {
        query = query.with_experiment_id(id);
    }
    if let Some(limit) = params.limit {
        query = query.with_limit(limit);
    }

    let records = sink.list(&query).await.map_err(|e| controller.fail(e))?;
    Ok(ApiResponse::ok(records))
}
