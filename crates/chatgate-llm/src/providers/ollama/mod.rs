//! Ollama - Local Ollama API provider
//!
//! Primary provider of the fallback chain: a locally running Ollama
//! server, called through its non-streaming `/api/generate` endpoint.

pub mod provider;
pub mod security;
pub mod types;


pub use provider::OllamaProvider;
pub use types::{OllamaConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
