use anyhow::{Context, Result};
use lumen_eval::{
    DatabaseHeuristicStore, DatabaseResultSink, Evaluator, HeuristicStore, InMemoryHeuristicStore,
    InMemoryResultSink, JudgeConfig, LlmJudge, ResultSink,
};
use lumen_model::{ModelConfig, PricingTable, ProviderFactory};
use lumen_server::{SecurityConfig, ServerConfig, create_app};
use lumen_telemetry::TelemetryConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{JudgeArgs, ServeArgs};

/// Evaluator with the configured default judge and no sink.
pub fn build_evaluator(judge: &JudgeArgs) -> Result<Evaluator> {
    let mut model = ModelConfig::new(judge.judge_provider, judge.judge_model.clone());
    if let Some(base_url) = &judge.judge_base_url {
        model = model.with_base_url(base_url.clone());
    }
    let providers = ProviderFactory::new(PricingTable::standard())
        .context("failed to build provider factory")?
        .with_default(model);

    let config = JudgeConfig {
        timeout: Duration::from_secs(judge.judge_timeout_secs.max(1)),
        ..JudgeConfig::default()
    };
    Ok(Evaluator::new(Arc::new(providers)).with_judge(LlmJudge::with_config(config)))
}

async fn open_storage(
    database_url: Option<&str>,
) -> Result<(Arc<dyn HeuristicStore>, Arc<dyn ResultSink>)> {
    let Some(url) = database_url else {
        tracing::warn!("no database configured; heuristic metrics and results are kept in memory");
        return Ok((Arc::new(InMemoryHeuristicStore::new()), Arc::new(InMemoryResultSink::new())));
    };

    let pool = lumen_eval::db::connect(url).await.context("failed to open database")?;
    let store = DatabaseHeuristicStore::from_pool(pool.clone());
    store.migrate().await?;
    let sink = DatabaseResultSink::from_pool(pool);
    sink.migrate().await?;
    tracing::info!(database = %url, "database ready");

    Ok((Arc::new(store), Arc::new(sink)))
}

fn security_config(args: &ServeArgs) -> SecurityConfig {
    let mut security = if args.dev {
        SecurityConfig::development()
    } else {
        SecurityConfig::production(args.allowed_origins.clone())
    };
    if args.dev {
        security.allowed_origins = args.allowed_origins.clone();
    }
    if let Some(limit) = args.max_body_bytes {
        security.max_body_size = limit;
    }
    if let Some(secs) = args.request_timeout_secs {
        security.request_timeout = Duration::from_secs(secs);
    }
    security
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut telemetry = TelemetryConfig::new("lumen-server").with_format(args.log_format);
    if let Some(endpoint) = &args.otlp_endpoint {
        telemetry = telemetry.with_otlp_endpoint(endpoint.clone());
    }
    if let Err(e) = lumen_telemetry::init_with_config(&telemetry) {
        eprintln!("Failed to initialize telemetry: {e}");
    }

    let (store, sink) = open_storage(args.database_url.as_deref()).await?;
    let evaluator = build_evaluator(&args.judge)?.with_sink(sink);

    let security = security_config(&args);
    if security.allowed_origins.is_empty() {
        tracing::warn!("CORS allows any origin; pass --allowed-origin in production");
    }
    let app = create_app(ServerConfig::new(evaluator, store).with_security(security));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        judge.provider = %args.judge.judge_provider,
        judge.model = %args.judge.judge_model,
        "lumen server listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    lumen_telemetry::shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}
