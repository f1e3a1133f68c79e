//! Ollama API types and configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama model
pub const DEFAULT_MODEL: &str = "llama2";

/// Default Ollama API URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default request timeout (local inference is slow on cold models)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// API Types
// ============================================================================

/// Request for the Ollama generate endpoint
#[derive(Debug, Serialize)]
pub struct OllamaGenerateRequest {
    /// The model name to use
    pub model: String,
    /// Prompt text
    pub prompt: String,
    /// Whether to stream the response
    pub stream: bool,
    /// Additional model options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Model configuration options for Ollama
#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Response from the Ollama generate endpoint
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // Fields used by serde for JSON deserialization
pub struct OllamaGenerateResponse {
    /// The model used to generate the response
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether generation is finished
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped
    #[serde(default)]
    pub done_reason: Option<String>,
}

/// Error body returned by Ollama
#[derive(Debug, Deserialize)]
pub struct OllamaError {
    /// Error message
    pub error: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL (default: http://localhost:11434)
    pub base_url: String,
    /// Default model
    pub default_model: String,
    /// Optional cap on generated tokens
    pub max_tokens: Option<u32>,
    /// Request timeout (longer for local inference)
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the generated token cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
