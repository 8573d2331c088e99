//! # lumen-model
//!
//! Completion providers that back Lumen's LLM judges.
//!
//! ## Overview
//!
//! Every provider implements [`lumen_core::CompletionProvider`]:
//!
//! - [`OpenAIClient`] - OpenAI chat completions, and OpenAI-compatible endpoints (`custom`)
//! - [`AnthropicClient`] - Claude models through the Messages API
//! - [`AzureOpenAIClient`] - Azure OpenAI deployments
//! - [`MockProvider`] - scripted provider for tests
//!
//! Providers are usually built through [`ProviderFactory`], which turns a
//! request's [`ModelConfig`] into a provider and prices usage through a shared
//! [`PricingTable`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumen_core::{CompletionParams, ProviderKind};
//! use lumen_model::{ModelConfig, PricingTable, ProviderFactory, ProviderResolver};
//!
//! # async fn run() -> lumen_core::Result<()> {
//! let factory = ProviderFactory::new(PricingTable::standard())?
//!     .with_default(ModelConfig::new(ProviderKind::OpenAI, "gpt-4o-mini"));
//!
//! let provider = factory.resolve(None)?;
//! let completion = provider.complete("Say hi", &CompletionParams::default()).await?;
//! println!("{}", completion.text);
//! # Ok(())
//! # }
//! ```
//!
//! ## API keys
//!
//! | Provider | Variable |
//! |----------|----------|
//! | `openai` | `OPENAI_API_KEY` |
//! | `anthropic` | `ANTHROPIC_API_KEY` |
//! | `azure` | `AZURE_OPENAI_API_KEY` |
//! | `custom` | `LUMEN_CUSTOM_API_KEY` (optional) |
//!
//! The variables are read for the provider's built-in endpoint and for the
//! factory's default model. A request config with its own `baseUrl` must carry
//! its own `apiKey`, unless it targets the default model's endpoint.

pub mod anthropic;
pub mod azure;
pub mod config;
pub mod factory;
mod http;
pub mod mock;
pub mod openai;
pub mod pricing;

pub use anthropic::AnthropicClient;
pub use azure::AzureOpenAIClient;
pub use config::ModelConfig;
pub use factory::{FixedProvider, ProviderFactory, ProviderResolver, build_provider};
pub use mock::MockProvider;
pub use openai::OpenAIClient;
pub use pricing::{ModelRate, PricingTable};
