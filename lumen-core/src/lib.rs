//! # lumen-core
//!
//! Core traits and types shared by the Lumen crates.
//!
//! ## Overview
//!
//! - [`CompletionProvider`] - The capability every judge model implements
//! - [`CompletionParams`] / [`Completion`] / [`TokenUsage`] - Call inputs and outputs
//! - [`ProviderKind`] - The supported provider families
//! - [`ProviderError`] / [`Result`] - Provider error handling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait CompletionProvider: Send + Sync {
//!     fn provider(&self) -> ProviderKind;
//!     fn model(&self) -> &str;
//!     async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<Completion>;
//!     fn estimate_cost(&self, usage: &TokenUsage) -> f64;
//! }
//! ```

pub mod error;
pub mod model;

pub use error::{ProviderError, Result};
pub use model::{Completion, CompletionParams, CompletionProvider, ProviderKind, TokenUsage};
