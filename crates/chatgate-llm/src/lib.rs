//! Chatgate LLM - text-generation providers and fallback dispatch
//!
//! This crate provides the generation side of chatgate:
//! - Provider: the `TextProvider` capability every backend implements
//! - Ollama: local model server (primary)
//! - Gemini: Google Gemini cloud API (used when an API key is configured)
//! - Hugging Face: local text-generation-inference server (last resort)
//! - Dispatch: ordered fallback across providers, explicit provider selection

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod provider;
pub mod providers;
pub mod util;

pub use dispatch::{
    DispatchAttempt, DispatchError, Dispatched, Dispatcher, ModelHint, ScriptedProvider, Step,
    KNOWN_PROVIDERS,
};
pub use error::{ProviderError, ProviderFailure, Result};
pub use provider::{Generation, TextProvider};

pub use providers::gemini::{GeminiConfig, GeminiProvider};
pub use providers::huggingface::{HuggingFaceConfig, HuggingFaceProvider};
pub use providers::ollama::{OllamaConfig, OllamaProvider};
