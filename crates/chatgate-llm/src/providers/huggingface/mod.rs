//! Hugging Face - local text-generation-inference provider
//!
//! Last resort of the fallback chain: a text-generation-inference server
//! hosting a small conversational model on the same machine. It serves a
//! single model, so model hints are not forwarded.

pub mod provider;
pub mod types;

#[cfg(test)]
mod tests;

pub use provider::HuggingFaceProvider;
pub use types::{HuggingFaceConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
