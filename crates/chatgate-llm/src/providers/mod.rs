//! Provider adapters
//!
//! One module per backend. Each exposes a `*Config` builder and a
//! `*Provider` implementing [`crate::TextProvider`].

pub mod gemini;
pub mod huggingface;
pub mod ollama;
