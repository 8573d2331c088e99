//! Azure OpenAI Service provider.

mod client;

pub use client::{AzureOpenAIClient, DEFAULT_AZURE_API_VERSION};
