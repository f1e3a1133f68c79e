//! Startup configuration validation

use super::config::{AppConfig, QuotaBackend, UsageBackend};
use anyhow::{bail, Result};
use tracing::warn;

/// Reject configurations the server cannot run with
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.server.port == 0 {
        bail!("server.port must be non-zero");
    }

    if config.redis.timeout_ms == 0 {
        bail!("redis.timeout_ms must be non-zero");
    }

    if config.quota.ttl_secs == 0 {
        bail!("quota.ttl_secs must be non-zero");
    }

    if config.storage.usage_backend == UsageBackend::Memory && config.storage.usage_capacity == 0 {
        bail!("storage.usage_capacity must be non-zero for the memory usage backend");
    }

    let providers = &config.providers;
    let timeouts = [
        ("ollama", providers.ollama.enabled, providers.ollama.timeout_secs),
        ("gemini", providers.gemini.enabled, providers.gemini.timeout_secs),
        (
            "huggingface",
            providers.huggingface.enabled,
            providers.huggingface.timeout_secs,
        ),
    ];
    for (name, enabled, timeout_secs) in timeouts {
        if enabled && timeout_secs == 0 {
            bail!("providers.{}.timeout_secs must be non-zero", name);
        }
    }

    if !timeouts.iter().any(|(_, enabled, _)| *enabled) {
        bail!("at least one provider must be enabled");
    }

    warn_production(config);
    Ok(())
}

fn warn_production(config: &AppConfig) {
    let is_production = super::loader::environment().eq_ignore_ascii_case("production");
    if !is_production {
        return;
    }

    if config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: Server is binding to all interfaces (0.0.0.0) in production. \
             Consider binding to 127.0.0.1 behind a reverse proxy."
        );
    }

    if config.quota.backend == QuotaBackend::Memory {
        warn!("Quota backend is in-memory: counters are per-process and reset on restart");
    }

    if config.redis.url.starts_with("redis://") && !config.redis.url.contains('@') {
        warn!(
            "SECURITY WARNING: Redis connection appears to have no authentication in production."
        );
    }
}
