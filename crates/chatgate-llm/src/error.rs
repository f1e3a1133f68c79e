//! Error types for chatgate-llm

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Why a single provider call failed.
///
/// Every adapter folds its transport, HTTP and payload errors into one of
/// these so the dispatcher can treat all providers alike.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderFailure {
    /// Provider is not configured (missing API key, disabled)
    #[error("provider not configured")]
    NotConfigured,

    /// Could not reach the backend
    #[error("connection failed: {0}")]
    Connect(String),

    /// Backend did not answer in time
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Backend answered with a non-success status
    #[error("http {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Sanitized error message
        message: String,
    },

    /// Requested model name cannot be sent to the backend
    #[error("invalid model name: {0}")]
    InvalidModel(String),

    /// Backend answered but the payload was unusable
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Any other backend-side failure
    #[error("backend error: {0}")]
    Backend(String),
}

/// A failed call against one named provider
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{provider}: {cause}")]
pub struct ProviderError {
    /// Provider name (`ollama`, `gemini`, `huggingface`)
    pub provider: String,
    /// Failure cause
    pub cause: ProviderFailure,
}

impl ProviderError {
    /// Create a new provider error
    #[must_use]
    pub fn new(provider: impl Into<String>, cause: ProviderFailure) -> Self {
        Self {
            provider: provider.into(),
            cause,
        }
    }

    /// Provider is known but was not constructed
    #[must_use]
    pub fn not_configured(provider: impl Into<String>) -> Self {
        Self::new(provider, ProviderFailure::NotConfigured)
    }

    /// Translate a transport-level reqwest error
    #[must_use]
    pub fn from_transport(provider: &str, err: &reqwest::Error, timeout: Duration) -> Self {
        let cause = if err.is_timeout() {
            ProviderFailure::Timeout(timeout.as_millis() as u64)
        } else if err.is_connect() {
            ProviderFailure::Connect(format!("failed to connect to {}", provider))
        } else if err.is_decode() {
            ProviderFailure::Malformed(err.to_string())
        } else {
            ProviderFailure::Backend(crate::util::sanitize_error_for_user(&err.to_string()))
        };
        Self::new(provider, cause)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProviderError>;
