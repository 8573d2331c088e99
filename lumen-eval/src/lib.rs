//! # lumen-eval
//!
//! Metric evaluation for Lumen.
//!
//! Scores a model's output either with a deterministic heuristic or with an
//! LLM judge, and optionally persists the result against a trace or
//! experiment.
//!
//! ## Features
//!
//! - **Heuristics**: `contains`, `equals`, `regex`, `is_json`, `levenshtein`,
//!   each with a typed config ([`HeuristicConfig`])
//! - **LLM judges**: `hallucination`, `relevance`, `moderation`, `usefulness`,
//!   `coherence`, with per-metric prompt templates and score shapes
//! - **Definitions**: named, toggleable heuristic metrics ([`HeuristicStore`])
//! - **Persistence**: fire-and-forget result recording ([`ResultSink`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumen_core::ProviderKind;
//! use lumen_eval::{EvaluationRequest, Evaluator, MetricKind};
//! use lumen_model::{ModelConfig, PricingTable, ProviderFactory};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let providers = ProviderFactory::new(PricingTable::standard())?
//!     .with_default(ModelConfig::new(ProviderKind::OpenAI, "gpt-4o-mini"));
//! let evaluator = Evaluator::new(Arc::new(providers));
//!
//! let request = EvaluationRequest::new(
//!     MetricKind::Relevance,
//!     "What is the capital of France?",
//!     "Paris",
//! );
//! let result = evaluator.evaluate_response(&request).await?;
//! println!("{} ({}ms)", result.score, result.latency_ms);
//! # Ok(())
//! # }
//! ```
//!
//! ## Cargo features
//!
//! - `sqlite` (default): [`DatabaseHeuristicStore`] and [`DatabaseResultSink`] on `sqlx`

pub mod config;
#[cfg(feature = "sqlite")]
pub mod db;
pub mod error;
pub mod evaluator;
pub mod heuristics;
pub mod judge;
pub mod metric;
pub mod schema;
pub mod sink;
pub mod store;
pub mod templates;

pub use config::{
    ContainsConfig, EqualsConfig, HeuristicConfig, IsJsonConfig, LevenshteinConfig, RegexConfig,
};
pub use error::{EvalError, FieldError, Result};
pub use evaluator::{BatchItem, DEFAULT_BATCH_CONCURRENCY, Evaluator};
pub use heuristics::{Heuristic, HeuristicRegistry, MAX_LEVENSHTEIN_CHARS};
pub use judge::{JudgeConfig, JudgeOutcome, LlmJudge, Verdict, parse_verdict};
pub use metric::{HeuristicKind, MetricKind, Score, ScoreShape};
pub use schema::{Correlation, EvaluationRequest, EvaluationResult};
pub use sink::{EvaluationRecord, InMemoryResultSink, NoopSink, RecordQuery, ResultSink};
pub use store::{
    DefinitionFilter, HeuristicMetricDefinition, HeuristicMetricUpdate, HeuristicStore,
    InMemoryHeuristicStore, NewHeuristicMetric,
};

#[cfg(feature = "sqlite")]
pub use sink::DatabaseResultSink;
#[cfg(feature = "sqlite")]
pub use store::DatabaseHeuristicStore;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::HeuristicConfig;
    pub use crate::error::{EvalError, Result};
    pub use crate::evaluator::{BatchItem, Evaluator};
    pub use crate::metric::{MetricKind, Score};
    pub use crate::schema::{Correlation, EvaluationRequest, EvaluationResult};
    pub use crate::sink::ResultSink;
    pub use crate::store::HeuristicStore;
}
