use lumen_eval::{Evaluator, HeuristicStore};
use std::{sync::Arc, time::Duration};

/// Security configuration for the Lumen server.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Allowed origins for CORS (empty = allow all, which is NOT recommended for production)
    pub allowed_origins: Vec<String>,
    /// Maximum request body size in bytes (default: 2MB)
    pub max_body_size: usize,
    /// Request timeout duration (default: 60 seconds, above the judge timeout)
    pub request_timeout: Duration,
    /// Whether to include provider and storage error text in 5xx responses
    pub expose_error_details: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_body_size: 2 * 1024 * 1024,
            request_timeout: Duration::from_secs(60),
            expose_error_details: false,
        }
    }
}

impl SecurityConfig {
    /// Permissive CORS and detailed errors.
    pub fn development() -> Self {
        Self { expose_error_details: true, ..Self::default() }
    }

    pub fn production(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins, ..Self::default() }
    }
}

/// Everything the router needs.
#[derive(Clone)]
pub struct ServerConfig {
    pub evaluator: Evaluator,
    pub store: Arc<dyn HeuristicStore>,
    pub security: SecurityConfig,
}

impl ServerConfig {
    pub fn new(evaluator: Evaluator, store: Arc<dyn HeuristicStore>) -> Self {
        Self { evaluator, store, security: SecurityConfig::default() }
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Configure allowed CORS origins
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.security.allowed_origins = origins;
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.security.max_body_size = size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.security.request_timeout = timeout;
        self
    }

    /// Enable detailed error messages (for development only)
    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.security.expose_error_details = expose;
        self
    }
}
