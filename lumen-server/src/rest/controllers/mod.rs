pub mod heuristics;
pub mod metrics;

pub use heuristics::HeuristicsController;
pub use metrics::MetricsController;
