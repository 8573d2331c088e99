use anyhow::{Context, Result};
use lumen_eval::{EvaluationRequest, EvaluationResult, HeuristicConfig};
use serde_json::Value;

use crate::cli::ScoreArgs;
use crate::serve::build_evaluator;

pub fn build_request(args: &ScoreArgs) -> Result<EvaluationRequest> {
    let mut request = EvaluationRequest::new(args.metric, args.input.clone(), args.output.clone())
        .with_context(args.context.clone());
    request.reference = args.reference.clone();

    if let Some(kind) = args.metric.heuristic_kind() {
        let config = match &args.config {
            Some(raw) => serde_json::from_str(raw).context("--config is not valid JSON")?,
            None => Value::Null,
        };
        request.heuristic_config = Some(HeuristicConfig::from_parts(kind, config)?);
    }
    Ok(request)
}

pub async fn run_score(args: ScoreArgs) -> Result<EvaluationResult> {
    let request = build_request(&args)?;
    let evaluator = build_evaluator(&args.judge)?;
    Ok(evaluator.evaluate_response(&request).await?)
}
