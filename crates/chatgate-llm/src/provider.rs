//! Text provider trait definition
//!
//! This module defines the single capability every generation backend
//! implements. Availability is decided when the provider is constructed;
//! a constructed provider is always callable.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text produced by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    /// Generated text
    pub text: String,
    /// Model that produced it
    pub model: String,
}

impl Generation {
    /// Create a generation result
    #[must_use]
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
        }
    }
}

/// Trait for text-generation providers
#[async_trait::async_trait]
pub trait TextProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Upper bound for a single `generate` call
    fn timeout(&self) -> Duration;

    /// Generate text for a prompt, optionally with a specific model
    async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<Generation>;
}
