use std::time::Duration;

/// Errors raised by completion providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider response error: {0}")]
    Response(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether the failure came from the provider's configuration rather than the call itself.
    pub fn is_config(&self) -> bool {
        matches!(self, ProviderError::Config(_))
    }

    /// HTTP status reported by the provider, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
