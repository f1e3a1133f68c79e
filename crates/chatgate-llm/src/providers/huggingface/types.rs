//! TGI wire types and provider configuration
//!
//! The server answers with either a single object or a list; both decode
//! through [`TgiResponse`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model served by the local inference server
pub const DEFAULT_MODEL: &str = "microsoft/DialoGPT-medium";

/// Default text-generation-inference URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default request timeout (CPU inference of the fallback model is slowest)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// API Types
// ============================================================================

/// Request for the `/generate` endpoint
#[derive(Debug, Serialize)]
pub struct TgiRequest {
    /// Prompt text
    pub inputs: String,
    /// Sampling parameters
    pub parameters: TgiParameters,
}

/// Sampling parameters
#[derive(Debug, Serialize)]
pub struct TgiParameters {
    /// Maximum number of new tokens
    pub max_new_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Whether to sample (vs. greedy decoding)
    pub do_sample: bool,
    /// Return only the continuation, not the prompt
    pub return_full_text: bool,
}

/// Generated text entry
#[derive(Debug, Deserialize)]
pub struct TgiGenerated {
    /// Generated continuation
    pub generated_text: String,
}

/// Response body; servers answer either with one object or a list of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TgiResponse {
    /// `{"generated_text": ...}`
    Single(TgiGenerated),
    /// `[{"generated_text": ...}]`
    Batch(Vec<TgiGenerated>),
}

impl TgiResponse {
    /// Generated text of the first result
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Single(g) => Some(g.generated_text),
            Self::Batch(list) => list.into_iter().next().map(|g| g.generated_text),
        }
    }
}

/// Error body returned by the server
#[derive(Debug, Deserialize)]
pub struct TgiError {
    /// Error message
    pub error: String,
}

/// Hugging Face provider configuration
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    /// Base URL of the inference server
    pub base_url: String,
    /// Model the server hosts (reported in `provider_used`)
    pub model: String,
    /// Maximum number of new tokens
    pub max_new_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_new_tokens: 100,
            temperature: 0.7,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HuggingFaceConfig {
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

    /// Set the hosted model name
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the new-token cap
    #[must_use]
    pub fn with_max_new_tokens(mut self, n: u32) -> Self {
        self.max_new_tokens = n;
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
