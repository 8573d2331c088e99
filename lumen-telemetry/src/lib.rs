//! # Lumen Telemetry
//!
//! Structured logging and distributed tracing for Lumen services.
//!
//! ## Features
//! - Structured logging with `tracing`, human-readable or JSON
//! - `RUST_LOG` filtering through `EnvFilter`
//! - Optional OTLP span export via OpenTelemetry
//!
//! ## Usage
//!
//! ```rust
//! use lumen_telemetry::{LogFormat, TelemetryConfig, info, init_with_config};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_with_config(&TelemetryConfig::new("lumen").with_format(LogFormat::Json))?;
//!     info!("ready");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

pub use spans::*;

pub use init::{
    LogFormat, TelemetryConfig, TelemetryError, init_telemetry, init_with_config,
    shutdown_telemetry,
};
