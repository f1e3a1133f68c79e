//! Quota - per-key daily counters and admission
//!
//! # Module Structure
//!
//! - `key`: counter and audit key naming per (identity, UTC day)
//! - `store`: the `QuotaStore` contract shared by all backends
//! - `memory_store`: in-process backend (tests, single-node deployments)
//! - `redis_store`: shared Redis backend
//! - `gate`: the admission decision built on a store

mod gate;
mod key;
mod memory_store;
mod redis_store;
mod store;

#[cfg(test)]
mod tests;

pub use gate::{Admission, AdmissionGate, Clock, Remaining};
pub use key::QuotaKey;
pub use memory_store::MemoryQuotaStore;
pub use redis_store::{RedisQuotaConfig, RedisQuotaStore};
pub use store::{AuditEntry, QuotaStore, StoreError, StoreResult, DEFAULT_TTL};

#[cfg(test)]
pub use store::MockQuotaStore;
