pub mod controllers;
pub mod response;

pub use controllers::{HeuristicsController, MetricsController};

use crate::ServerConfig;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Build CORS layer based on security configuration
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.security.allowed_origins.is_empty() {
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> =
            config.security.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

/// Create the HTTP application. All routes live under `/api`.
pub fn create_app(config: ServerConfig) -> Router {
    let metrics_controller = MetricsController::new(config.clone());
    let heuristics_controller = HeuristicsController::new(config.clone());

    let api_router = Router::new()
        .route("/health", get(health_check))
        .route("/metrics/evaluate", post(controllers::metrics::evaluate))
        .route("/metrics/evaluate/batch", post(controllers::metrics::evaluate_batch))
        .route("/metrics/results", get(controllers::metrics::list_results))
        .with_state(metrics_controller)
        .route(
            "/heuristic-metrics",
            get(controllers::heuristics::list_heuristics)
                .post(controllers::heuristics::create_heuristic),
        )
        .route(
            "/heuristic-metrics/{id}",
            get(controllers::heuristics::get_heuristic)
                .put(controllers::heuristics::update_heuristic),
        )
        .route("/heuristic-metrics/{id}/toggle", patch(controllers::heuristics::toggle_heuristic))
        .route(
            "/heuristic-metrics/{id}/evaluate",
            post(controllers::heuristics::evaluate_heuristic),
        )
        .with_state(heuristics_controller);

    let app = Router::new().nest("/api", api_router);

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.security.request_timeout,
            ))
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(build_cors_layer(&config))
            // Security headers
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            )),
    )
}

async fn health_check() -> &'static str {
    "OK"
}
