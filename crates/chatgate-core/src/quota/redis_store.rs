//! Redis-backed quota store (for production)
//!
//! Counters are plain Redis integers. Creation and TTL assignment happen in a
//! single Lua script so a counter can never be left without an expiry, and
//! the conditional increment used for admission runs in one script as well.
//!
//! The multiplexed connection is cached and dropped after a connection error
//! or timeout; the next operation reconnects.

use super::store::{AuditEntry, QuotaStore, StoreError, StoreResult, DEFAULT_TTL};
use crate::error::{Error, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// INCR, setting the TTL when the counter was just created
const INCREMENT_SCRIPT: &str = r#"
local n = redis.call('INCR', KEYS[1])
if n == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return n
"#;

/// INCR only while below ARGV[1]; -1 means the limit was reached
const INCREMENT_BELOW_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current >= tonumber(ARGV[1]) then
    return -1
end
local n = redis.call('INCR', KEYS[1])
if n == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
return n
"#;

/// Check if a Redis error means the cached connection is unusable
fn is_connection_error(err: &redis::RedisError) -> bool {
    if err.is_io_error() || err.is_timeout() {
        return true;
    }
    let message = err.to_string().to_lowercase();
    message.contains("broken pipe")
        || message.contains("connection reset")
        || message.contains("connection refused")
        || message.contains("connection closed")
        || message.contains("not connected")
}

/// Redis quota store settings
#[derive(Debug, Clone)]
pub struct RedisQuotaConfig {
    /// Connection URL (`redis://host:port/db`)
    pub url: String,
    /// Prefix prepended to every key
    pub key_prefix: String,
    /// Upper bound for one Redis round trip
    pub timeout: Duration,
    /// Counter and audit entry lifetime
    pub ttl: Duration,
}

impl Default for RedisQuotaConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: String::new(),
            timeout: Duration::from_millis(500),
            ttl: DEFAULT_TTL,
        }
    }
}

impl RedisQuotaConfig {
    /// Settings for a URL with default prefix, timeout and TTL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the key prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the per-operation timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the counter TTL
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Redis quota store
pub struct RedisQuotaStore {
    client: redis::Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    config: RedisQuotaConfig,
    increment: redis::Script,
    increment_below: redis::Script,
}

impl RedisQuotaStore {
    /// Create a store. No connection is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns error if the Redis URL is invalid
    pub fn new(config: RedisQuotaConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| Error::Configuration(format!("invalid redis url: {}", e)))?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            config,
            increment: redis::Script::new(INCREMENT_SCRIPT),
            increment_below: redis::Script::new(INCREMENT_BELOW_SCRIPT),
        })
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    fn ttl_secs(&self) -> u64 {
        self.config.ttl.as_secs().max(1)
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout.as_millis() as u64
    }

    /// Cached connection, connecting if there is none
    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut guard = self.connection.write().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = match timeout(
            self.config.timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return Err(StoreError::Unavailable(format!("connect failed: {}", e)));
            }
            Err(_) => return Err(StoreError::Timeout(self.timeout_ms())),
        };

        info!("Connected to Redis quota store");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn clear_connection_for_reconnect(&self) {
        let mut guard = self.connection.write().await;
        if guard.take().is_some() {
            warn!("Clearing stale Redis connection to trigger reconnection");
        }
    }

    /// Run one operation with the timeout and reconnect policy applied
    async fn run<T, F, Fut>(&self, op: &'static str, f: F) -> StoreResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.connection().await?;

        match timeout(self.config.timeout, f(conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if is_connection_error(&e) {
                    self.clear_connection_for_reconnect().await;
                }
                Err(StoreError::Unavailable(format!("{} failed: {}", op, e)))
            }
            Err(_) => {
                self.clear_connection_for_reconnect().await;
                Err(StoreError::Timeout(self.timeout_ms()))
            }
        }
    }
}

#[async_trait]
impl QuotaStore for RedisQuotaStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> StoreResult<u64> {
        let key = self.build_key(key);
        let value: Option<u64> = self
            .run("GET", |mut conn| async move {
                redis::cmd("GET").arg(&key).query_async(&mut conn).await
            })
            .await?;
        Ok(value.unwrap_or(0))
    }

    async fn increment_and_get(&self, key: &str) -> StoreResult<u64> {
        let key = self.build_key(key);
        let script = self.increment.clone();
        let ttl = self.ttl_secs();

        let count: u64 = self
            .run("INCR", |mut conn| async move {
                script.key(&key).arg(ttl).invoke_async(&mut conn).await
            })
            .await?;
        Ok(count)
    }

    async fn increment_below(&self, key: &str, limit: u64) -> StoreResult<Option<u64>> {
        let full_key = self.build_key(key);
        let script = self.increment_below.clone();
        let ttl = self.ttl_secs();

        let result: i64 = self
            .run("INCR below limit", |mut conn| async move {
                script
                    .key(&full_key)
                    .arg(limit)
                    .arg(ttl)
                    .invoke_async(&mut conn)
                    .await
            })
            .await?;

        if result < 0 {
            debug!(key = %key, limit, "Counter at limit, not incremented");
            Ok(None)
        } else {
            Ok(Some(result as u64))
        }
    }

    async fn record_audit(&self, key: &str, entry: &AuditEntry) -> StoreResult<()> {
        let key = self.build_key(key);
        let ttl = self.ttl_secs();
        let count = entry.count;
        let ip = entry.ip.clone();
        let timestamp = entry.timestamp.to_rfc3339();

        self.run("HSET", |mut conn| async move {
            redis::pipe()
                .atomic()
                .cmd("HSET")
                .arg(&key)
                .arg("count")
                .arg(count)
                .arg("ip")
                .arg(&ip)
                .arg("timestamp")
                .arg(&timestamp)
                .ignore()
                .cmd("EXPIRE")
                .arg(&key)
                .arg(ttl)
                .ignore()
                .query_async(&mut conn)
                .await
        })
        .await
    }

    async fn ping(&self) -> StoreResult<Duration> {
        let started = Instant::now();
        let _pong: String = self
            .run("PING", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(started.elapsed())
    }
}
