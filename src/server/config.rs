//! Server configuration types

use chatgate_core::StaticKey;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Keys consulted before the database
    #[serde(default)]
    pub keys: Vec<StaticKey>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: String::new(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_timeout_ms() -> u64 {
    500
}

/// Where daily counters live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaBackend {
    #[default]
    Redis,
    Memory,
}

/// Quota settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default)]
    pub backend: QuotaBackend,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            backend: QuotaBackend::default(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl QuotaConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_ttl_secs() -> u64 {
    86_400
}

/// Where usage records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageBackend {
    /// `chat_logs` table
    #[default]
    Sqlite,
    /// Bounded in-process buffer, lost on restart
    Memory,
}

/// Usage and key storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Empty for `~/.chatgate/chatgate.db`, `:memory:` for an in-memory database
    #[serde(default)]
    pub database_path: String,
    #[serde(default)]
    pub usage_backend: UsageBackend,
    /// Records kept by the memory usage backend before the oldest are dropped
    #[serde(default = "default_usage_capacity")]
    pub usage_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            usage_backend: UsageBackend::default(),
            usage_capacity: default_usage_capacity(),
        }
    }
}

fn default_usage_capacity() -> usize {
    10_000
}

/// Provider chain, in fallback order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub ollama: OllamaSettings,
    #[serde(default)]
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub huggingface: HuggingFaceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
    /// Sent as `options.num_predict`
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout(),
            max_tokens: None,
        }
    }
}

fn default_ollama_url() -> String {
    chatgate_llm::providers::ollama::DEFAULT_BASE_URL.to_string()
}

fn default_ollama_model() -> String {
    chatgate_llm::providers::ollama::DEFAULT_MODEL.to_string()
}

fn default_ollama_timeout() -> u64 {
    60
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Falls back to `GEMINI_API_KEY` / `GOOGLE_API_KEY` when empty
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
    /// Sent as `generationConfig.maxOutputTokens`
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("enabled", &self.enabled)
            .field("api_key", &chatgate_llm::util::mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            base_url: default_gemini_url(),
            model: default_gemini_model(),
            timeout_secs: default_gemini_timeout(),
            max_output_tokens: None,
        }
    }
}

fn default_gemini_url() -> String {
    chatgate_llm::providers::gemini::DEFAULT_BASE_URL.to_string()
}

fn default_gemini_model() -> String {
    chatgate_llm::providers::gemini::DEFAULT_MODEL.to_string()
}

fn default_gemini_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_hf_url")]
    pub base_url: String,
    #[serde(default = "default_hf_model")]
    pub model: String,
    #[serde(default = "default_hf_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for HuggingFaceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_hf_url(),
            model: default_hf_model(),
            timeout_secs: default_hf_timeout(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_hf_url() -> String {
    chatgate_llm::providers::huggingface::DEFAULT_BASE_URL.to_string()
}

fn default_hf_model() -> String {
    chatgate_llm::providers::huggingface::DEFAULT_MODEL.to_string()
}

fn default_hf_timeout() -> u64 {
    120
}

fn default_max_new_tokens() -> u32 {
    100
}

fn default_temperature() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}
