//! Configuration loading
//!
//! Layers, lowest priority first: embedded defaults, `config/default`,
//! `config/{CHATGATE_ENV}`, `config/local`, then `CHATGATE_*` variables.
//!
//! The unprefixed `OLLAMA_URL`, `GEMINI_API_KEY` and `CORS_ORIGINS` are
//! honored too, unless the matching `CHATGATE_*` variable is set.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Active environment name (`CHATGATE_ENV`, default `development`)
pub fn environment() -> String {
    std::env::var("CHATGATE_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", environment())).required(false))
        .add_source(File::with_name("config/local").required(false))
        // CHATGATE_SERVER__PORT, not CHATGATE__SERVER__PORT
        .add_source(
            Environment::with_prefix("CHATGATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    apply_legacy_env(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

fn apply_legacy_env(config: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    let value = |name: &str| {
        var(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if value("CHATGATE_PROVIDERS__OLLAMA__BASE_URL").is_none() {
        if let Some(url) = value("OLLAMA_URL").or_else(|| value("OLLAMA_HOST")) {
            config.providers.ollama.base_url = url;
        }
    }

    if config.providers.gemini.api_key.trim().is_empty() {
        if let Some(key) = value("GEMINI_API_KEY").or_else(|| value("GOOGLE_API_KEY")) {
            config.providers.gemini.api_key = key;
        }
    }

    if value("CHATGATE_SERVER__CORS_ORIGINS").is_none() {
        if let Some(origins) = value("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
}
