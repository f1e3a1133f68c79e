//! Key directory - resolving caller credentials
//!
//! Keys are issued and managed elsewhere; this module only answers "who is
//! this and what is their daily limit".

use async_trait::async_trait;
use chatgate_llm::util::mask_api_key;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Daily limit applied to keys that do not specify one
pub const DEFAULT_DAILY_LIMIT: u64 = 10;

/// A resolved caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCaller {
    /// Quota subject
    pub identity: String,
    /// Display name of the key
    pub name: Option<String>,
    /// Requests allowed per UTC day
    pub daily_limit: u64,
}

/// Key resolution failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Unknown or inactive key
    #[error("invalid API key")]
    Invalid,

    /// The directory backend failed
    #[error("key directory unavailable: {0}")]
    Unavailable(String),
}

/// Credential lookup
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Resolve a raw credential
    async fn resolve(&self, raw: &str) -> Result<ResolvedCaller, KeyError>;
}

/// A key declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticKey {
    /// Key string
    pub key: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Requests per UTC day
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u64,
}

fn default_daily_limit() -> u64 {
    DEFAULT_DAILY_LIMIT
}

/// Keys held in memory
#[derive(Debug, Default)]
pub struct StaticKeyDirectory {
    keys: HashMap<String, StaticKey>,
}

impl StaticKeyDirectory {
    /// Build from configured keys; blank keys are skipped
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = StaticKey>) -> Self {
        let keys = keys
            .into_iter()
            .filter(|k| !k.key.trim().is_empty())
            .map(|k| (k.key.clone(), k))
            .collect();
        Self { keys }
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether there are no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyDirectory for StaticKeyDirectory {
    async fn resolve(&self, raw: &str) -> Result<ResolvedCaller, KeyError> {
        self.keys
            .get(raw)
            .map(|k| ResolvedCaller {
                identity: k.key.clone(),
                name: k.name.clone(),
                daily_limit: k.daily_limit,
            })
            .ok_or(KeyError::Invalid)
    }
}

/// Consults directories in order; the first that knows the key wins
pub struct CompositeKeyDirectory {
    directories: Vec<Arc<dyn KeyDirectory>>,
}

impl CompositeKeyDirectory {
    /// Create from an ordered list
    #[must_use]
    pub fn new(directories: Vec<Arc<dyn KeyDirectory>>) -> Self {
        Self { directories }
    }
}

#[async_trait]
impl KeyDirectory for CompositeKeyDirectory {
    async fn resolve(&self, raw: &str) -> Result<ResolvedCaller, KeyError> {
        let mut last_error = KeyError::Invalid;

        for directory in &self.directories {
            match directory.resolve(raw).await {
                Ok(caller) => return Ok(caller),
                Err(KeyError::Invalid) => continue,
                Err(err) => {
                    debug!(caller = %mask_api_key(raw), error = %err, "Key directory failed, trying next");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }
}
