use axum::{
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use lumen_eval::{
    Correlation, DefinitionFilter, EvalError, EvaluationResult, Evaluator, FieldError,
    HeuristicConfig, HeuristicKind, HeuristicMetricDefinition, HeuristicMetricUpdate,
    HeuristicStore, NewHeuristicMetric,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

use crate::ServerConfig;
use crate::error::ApiError;
use crate::rest::response::{ApiJson, ApiResponse};

#[derive(Clone)]
pub struct HeuristicsController {
    store: Arc<dyn HeuristicStore>,
    evaluator: Evaluator,
    expose_error_details: bool,
}

impl HeuristicsController {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: config.store,
            evaluator: config.evaluator,
            expose_error_details: config.security.expose_error_details,
        }
    }

    fn fail(&self, error: EvalError) -> ApiError {
        ApiError::new(error).with_details(self.expose_error_details)
    }
}

fn parse_type(field: &str, raw: &str) -> Result<HeuristicKind, EvalError> {
    raw.parse().map_err(|_| {
        let names: Vec<_> = HeuristicKind::ALL.iter().map(|k| k.as_str()).collect();
        EvalError::validation(field, format!("must be one of: {}", names.join(", ")))
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub is_active: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn list_heuristics(
    State(controller): State<HeuristicsController>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<HeuristicMetricDefinition>>, ApiError> {
    let Query(params) = params?;
    let kind = params
        .kind
        .as_deref()
        .map(|raw| parse_type("type", raw))
        .transpose()
        .map_err(|e| controller.fail(e))?;

    let filter = DefinitionFilter { is_active: params.is_active, kind };
    let definitions = controller.store.list(&filter).await.map_err(|e| controller.fail(e))?;
    Ok(ApiResponse::ok(definitions))
}

/// Body of `POST /api/heuristic-metrics`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHeuristicBody {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Omitted or `null` means the type's defaults.
    #[serde(default)]
    pub config: Value,
}

impl CreateHeuristicBody {
    pub fn into_new(self) -> Result<NewHeuristicMetric, EvalError> {
        let mut errors = Vec::new();
        if self.name.is_none() {
            errors.push(FieldError::new("name", "is required"));
        }
        let kind = match self.kind.as_deref() {
            None => {
                errors.push(FieldError::new("type", "is required"));
                None
            }
            Some(raw) => match parse_type("type", raw) {
                Ok(kind) => Some(kind),
                Err(EvalError::Validation(mut fields)) => {
                    errors.append(&mut fields);
                    None
                }
                Err(e) => return Err(e),
            },
        };

        let (Some(name), Some(kind), true) = (self.name, kind, errors.is_empty()) else {
            return Err(EvalError::Validation(errors));
        };
        let config = HeuristicConfig::from_parts(kind, self.config)?;
        let mut new = NewHeuristicMetric::new(name, config);
        new.description = self.description;
        Ok(new)
    }
}

pub async fn create_heuristic(
    State(controller): State<HeuristicsController>,
    ApiJson(body): ApiJson<CreateHeuristicBody>,
) -> Result<(StatusCode, ApiResponse<HeuristicMetricDefinition>), ApiError> {
    let new = body.into_new().map_err(|e| controller.fail(e))?;
    let definition = controller.store.create(new).await.map_err(|e| controller.fail(e))?;
    Ok(ApiResponse::created(definition))
}

pub async fn get_heuristic(
    State(controller): State<HeuristicsController>,
    id: Result<Path<String>, PathRejection>,
) -> Result<ApiResponse<HeuristicMetricDefinition>, ApiError> {
    let Path(id) = id?;
    let definition = controller.store.get(&id).await.map_err(|e| controller.fail(e))?;
    Ok(ApiResponse::ok(definition))
}

/// Body of `PUT /api/heuristic-metrics/{id}`. A `config` without `type`
/// keeps the stored type.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHeuristicBody {
    pub name: Option<String>,
    /// Absent leaves the description alone; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub config: Option<Value>,
}

/// Marks a field as present, so `null` becomes `Some(None)` rather than `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub async fn update_heuristic(
    State(controller): State<HeuristicsController>,
    id: Result<Path<String>, PathRejection>,
    ApiJson(body): ApiJson<UpdateHeuristicBody>,
) -> Result<ApiResponse<HeuristicMetricDefinition>, ApiError> {
    let Path(id) = id?;
    let kind = body
        .kind
        .as_deref()
        .map(|raw| parse_type("type", raw))
        .transpose()
        .map_err(|e| controller.fail(e))?;

    let config = match (kind, body.config) {
        (None, None) => None,
        (Some(kind), config) => Some(HeuristicConfig::from_parts(kind, config.unwrap_or(Value::Null))),
        (None, Some(config)) => {
            let current = controller.store.get(&id).await.map_err(|e| controller.fail(e))?;
            Some(HeuristicConfig::from_parts(current.kind(), config))
        }
    }
    .transpose()
    .map_err(|e| controller.fail(e))?;

    let update = HeuristicMetricUpdate { name: body.name, description: body.description, config };
    if update.is_empty() {
        return Err(controller.fail(EvalError::validation(
            "body",
            "at least one of name, description, type, config is required",
        )));
    }

    let definition = controller.store.update(&id, update).await.map_err(|e| controller.fail(e))?;
    Ok(ApiResponse::ok(definition))
}

pub async fn toggle_heuristic(
    State(controller): State<HeuristicsController>,
    id: Result<Path<String>, PathRejection>,
) -> Result<ApiResponse<HeuristicMetricDefinition>, ApiError> {
    let Path(id) = id?;
    let definition = controller.store.toggle(&id).await.map_err(|e| controller.fail(e))?;
    tracing::info!(metric.id = %definition.id, is_active = definition.is_active, "heuristic metric toggled");
    Ok(ApiResponse::ok(definition))
}

/// Body of `POST /api/heuristic-metrics/{id}/evaluate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBody {
    pub output: Option<String>,
    pub reference: Option<String>,
    pub trace_id: Option<String>,
    pub experiment_id: Option<String>,
}

pub async fn evaluate_heuristic(
    State(controller): State<HeuristicsController>,
    id: Result<Path<String>, PathRejection>,
    ApiJson(body): ApiJson<ScoreBody>,
) -> Result<ApiResponse<EvaluationResult>, ApiError> {
    let Path(id) = id?;
    let output = body
        .output
        .ok_or_else(|| controller.fail(EvalError::validation("output", "is required")))?;
    let definition = controller.store.get(&id).await.map_err(|e| controller.fail(e))?;

    let result = controller
        .evaluator
        .score_definition(&definition, &output, body.reference.as_deref())
        .map_err(|e| controller.fail(e))?;
    controller.evaluator.record(&result, &Correlation::new(body.trace_id, body.experiment_id));

    Ok(ApiResponse::ok(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_body_defaults_config() {
        let body: CreateHeuristicBody =
            serde_json::from_value(json!({ "name": "json", "type": "is_json" })).unwrap();
        let new = body.into_new().unwrap();
        assert_eq!(new.config.kind(), HeuristicKind::IsJson);
    }

    #[test]
    fn test_create_body_collects_errors() {
        let body: CreateHeuristicBody =
            serde_json::from_value(json!({ "type": "fuzzy" })).unwrap();
        let EvalError::Validation(fields) = body.into_new().unwrap_err() else {
            panic!("expected validation");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["name", "type"]);
    }

    #[test]
    fn test_update_body_description_null_vs_absent() {
        let absent: UpdateHeuristicBody = serde_json::from_value(json!({ "name": "x" })).unwrap();
        assert_eq!(absent.description, None);

        let cleared: UpdateHeuristicBody =
            serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateHeuristicBody =
            serde_json::from_value(json!({ "description": "checks JSON" })).unwrap();
        assert_eq!(set.description, Some(Some("checks JSON".to_string())));
    }

    #[test]
    fn test_create_body_bad_config() {
        let body: CreateHeuristicBody = serde_json::from_value(json!({
            "name": "r",
            "type": "regex",
            "config": { "flags": "i" }
        }))
        .unwrap();
        assert!(matches!(body.into_new(), Err(EvalError::InvalidConfig(_))));
    }
}
