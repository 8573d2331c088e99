//! # lumen-server
//!
//! HTTP API for Lumen metric evaluation.
//!
//! ```rust,no_run
//! use lumen_eval::{Evaluator, InMemoryHeuristicStore};
//! use lumen_model::{PricingTable, ProviderFactory};
//! use lumen_server::{ServerConfig, create_app};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let evaluator = Evaluator::new(Arc::new(ProviderFactory::new(PricingTable::standard())?));
//! let config = ServerConfig::new(evaluator, Arc::new(InMemoryHeuristicStore::new()));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, create_app(config)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod rest;

pub use config::{SecurityConfig, ServerConfig};
pub use error::{ApiError, status_for};
pub use rest::create_app;
