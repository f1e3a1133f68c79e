//! Provider chain resolution
//!
//! Builds the dispatcher in fixed fallback order: Ollama, Gemini,
//! Hugging Face. A provider that cannot be constructed is skipped. Gemini
//! needs `providers.gemini.api_key`, which the loader fills from
//! `GEMINI_API_KEY` when unset.

use super::config::ProvidersConfig;
use anyhow::{bail, Result};
use chatgate_llm::{
    Dispatcher, GeminiConfig, GeminiProvider, HuggingFaceConfig, HuggingFaceProvider,
    OllamaConfig, OllamaProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Build the dispatcher from configuration
pub fn resolve_dispatcher(config: &ProvidersConfig) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new();

    if config.ollama.enabled {
        let settings = &config.ollama;
        let mut ollama = OllamaConfig::new()
            .with_base_url(&settings.base_url)
            .with_model(&settings.model)
            .with_timeout(Duration::from_secs(settings.timeout_secs));
        if let Some(max_tokens) = settings.max_tokens {
            ollama = ollama.with_max_tokens(max_tokens);
        }
        match OllamaProvider::new(ollama) {
            Ok(provider) => {
                dispatcher.register(Arc::new(provider));
                info!(base_url = %settings.base_url, model = %settings.model, "Registered Ollama provider");
            }
            Err(e) => warn!("Ollama provider not available: {}", e),
        }
    }

    if config.gemini.enabled {
        let settings = &config.gemini;
        let key = Some(settings.api_key.trim()).filter(|k| !k.is_empty());

        match key {
            Some(key) => {
                let mut gemini = GeminiConfig::new(key)
                    .with_base_url(&settings.base_url)
                    .with_model(&settings.model)
                    .with_timeout(Duration::from_secs(settings.timeout_secs));
                if let Some(max_tokens) = settings.max_output_tokens {
                    gemini = gemini.with_max_output_tokens(max_tokens);
                }
                match GeminiProvider::new(gemini) {
                    Ok(provider) => {
                        dispatcher.register(Arc::new(provider));
                        info!(model = %settings.model, "Registered Gemini provider");
                    }
                    Err(e) => warn!("Gemini provider not available: {}", e),
                }
            }
            None => debug!("Gemini provider skipped: no API key"),
        }
    }

    if config.huggingface.enabled {
        let settings = &config.huggingface;
        let hf = HuggingFaceConfig::new()
            .with_base_url(&settings.base_url)
            .with_model(&settings.model)
            .with_max_new_tokens(settings.max_new_tokens)
            .with_temperature(settings.temperature)
            .with_timeout(Duration::from_secs(settings.timeout_secs));
        match HuggingFaceProvider::new(hf) {
            Ok(provider) => {
                dispatcher.register(Arc::new(provider));
                info!(base_url = %settings.base_url, model = %settings.model, "Registered Hugging Face provider");
            }
            Err(e) => warn!("Hugging Face provider not available: {}", e),
        }
    }

    if dispatcher.is_empty() {
        bail!("No text providers available. Enable Ollama or Hugging Face, or set GEMINI_API_KEY.");
    }

    info!(chain = ?dispatcher.chain(), "Provider chain ready");
    Ok(dispatcher)
}
