//! Quota store contract
//!
//! A store holds integer counters that are created on first increment with a
//! fixed TTL and never reset by later increments. All operations must be
//! atomic with respect to concurrent callers sharing a key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Counter lifetime: one day from creation
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Quota store failure. Callers treat every variant as "store unavailable".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend unreachable or returned an error
    #[error("quota store unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer within the operation timeout
    #[error("quota store timed out after {0}ms")]
    Timeout(u64),
}

/// Result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Last-admission snapshot kept next to the counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    /// Counter value after the admission
    pub count: u64,
    /// Source address of the admitted request
    pub ip: String,
    /// When the admission happened
    pub timestamp: DateTime<Utc>,
}

/// Shared TTL counter store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Backend name for diagnostics (`redis`, `memory`)
    fn backend(&self) -> &'static str;

    /// Current value, 0 when absent or expired. Never mutates.
    async fn get(&self, key: &str) -> StoreResult<u64>;

    /// Increment, creating the counter with the store TTL when absent.
    /// Returns the post-increment value.
    async fn increment_and_get(&self, key: &str) -> StoreResult<u64>;

    /// Increment only while the current value is below `limit`.
    ///
    /// Returns `None` without mutating when the counter is already at or
    /// above `limit`, otherwise the post-increment value.
    async fn increment_below(&self, key: &str, limit: u64) -> StoreResult<Option<u64>>;

    /// Overwrite the audit entry stored under `key`
    async fn record_audit(&self, key: &str, entry: &AuditEntry) -> StoreResult<()>;

    /// Round-trip latency to the backend
    async fn ping(&self) -> StoreResult<Duration>;
}
