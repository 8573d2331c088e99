//! Anthropic provider implementation.

mod client;
pub(crate) mod convert;

pub use client::{ANTHROPIC_BASE_URL, ANTHROPIC_VERSION, AnthropicClient};
