//! OpenAI provider implementation.
//!
//! Supports the public OpenAI API and self-hosted OpenAI-compatible servers.
//!
//! # Example
//!
//! ```rust,ignore
//! use lumen_model::openai::OpenAIClient;
//!
//! let config = ModelConfig::new(ProviderKind::OpenAI, "gpt-4o-mini").with_api_key(key);
//! let client = OpenAIClient::new(reqwest::Client::new(), &config, pricing)?;
//! ```

mod client;
pub(crate) mod convert;

pub use client::{OPENAI_BASE_URL, OpenAIClient};
