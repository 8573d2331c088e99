//! # lumen-cli
//!
//! Command-line launcher for Lumen.
//!
//! - `lumen serve`: run the HTTP API (`LUMEN_*` environment variables mirror every flag)
//! - `lumen score`: evaluate one output locally and print the result

pub mod cli;
pub mod score;
pub mod serve;

pub use cli::{Cli, Commands, JudgeArgs, ScoreArgs, ServeArgs};
pub use score::run_score;
pub use serve::run_serve;
