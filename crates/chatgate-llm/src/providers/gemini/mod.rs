//! Gemini - Google Gemini cloud API provider
//!
//! Second link of the fallback chain. Only constructed when an API key is
//! available; an unconfigured Gemini is simply absent from the chain.

pub mod config;
pub mod provider;
pub mod types;


pub use config::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use provider::GeminiProvider;
