//! In-memory quota store
//!
//! Counters live in a `DashMap`; the shard lock held by `entry()` makes each
//! read-modify-write atomic per key. Expired entries are replaced on the
//! next write and read as 0.

use super::store::{AuditEntry, QuotaStore, StoreResult, DEFAULT_TTL};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Slot<T> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local quota store
#[derive(Debug)]
pub struct MemoryQuotaStore {
    counters: DashMap<String, Slot<u64>>,
    audits: DashMap<String, Slot<AuditEntry>>,
    ttl: Duration,
}

impl Default for MemoryQuotaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQuotaStore {
    /// Create a store with the default one-day TTL
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a store with a custom TTL
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            counters: DashMap::new(),
            audits: DashMap::new(),
            ttl,
        }
    }

    /// Last audit entry written under `key`, if still live
    #[must_use]
    pub fn audit(&self, key: &str) -> Option<AuditEntry> {
        let now = Instant::now();
        self.audits
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value.clone())
    }

    /// Drop expired counters and audit entries
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len() + self.audits.len();
        self.counters.retain(|_, slot| slot.is_live(now));
        self.audits.retain(|_, slot| slot.is_live(now));
        let purged = before - (self.counters.len() + self.audits.len());
        if purged > 0 {
            debug!(purged, "Purged expired quota entries");
        }
        purged
    }

    /// Apply `step` to the live counter (or 0 for a fresh one) under the shard lock
    fn update<F>(&self, key: &str, step: F) -> Option<u64>
    where
        F: FnOnce(u64) -> Option<u64>,
    {
        let now = Instant::now();
        match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().is_live(now) => {
                let next = step(occupied.get().value)?;
                occupied.get_mut().value = next;
                Some(next)
            }
            Entry::Occupied(mut occupied) => {
                let next = step(0)?;
                occupied.insert(Slot {
                    value: next,
                    expires_at: now + self.ttl,
                });
                Some(next)
            }
            Entry::Vacant(vacant) => {
                let next = step(0)?;
                vacant.insert(Slot {
                    value: next,
                    expires_at: now + self.ttl,
                });
                Some(next)
            }
        }
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> StoreResult<u64> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map_or(0, |slot| slot.value))
    }

    async fn increment_and_get(&self, key: &str) -> StoreResult<u64> {
        Ok(self.update(key, |n| Some(n + 1)).unwrap_or_default())
    }

    async fn increment_below(&self, key: &str, limit: u64) -> StoreResult<Option<u64>> {
        Ok(self.update(key, |n| (n < limit).then_some(n + 1)))
    }

    async fn record_audit(&self, key: &str, entry: &AuditEntry) -> StoreResult<()> {
        self.audits.insert(
            key.to_string(),
            Slot {
                value: entry.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> StoreResult<Duration> {
        Ok(Duration::ZERO)
    }
}
