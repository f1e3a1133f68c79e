//! Chatgate Core - admission, recording and the request pipeline
//!
//! This crate contains the quota-gated request path:
//! - Quota: shared daily counters (Redis or in-memory) and the admission gate
//! - Keys: resolution of caller credentials to identity and daily limit
//! - Usage: audit records of served requests
//! - Storage: SQLite persistence for usage records and API keys
//! - Metrics: injectable in-process registry with Prometheus export
//! - Gateway: admission, dispatch and recording for one request

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod gateway;
pub mod keys;
pub mod metrics;
pub mod quota;
pub mod storage;
pub mod usage;

pub use error::{Error, Result};
pub use gateway::{Gateway, GatewayError, GenerateRequest, QuotaStatus, Rejection, Served};
pub use keys::{
    CompositeKeyDirectory, KeyDirectory, KeyError, ResolvedCaller, StaticKey, StaticKeyDirectory,
};
pub use metrics::{GatewayMetrics, MetricsRegistry};
pub use quota::{
    Admission, AdmissionGate, AuditEntry, Clock, MemoryQuotaStore, QuotaKey, QuotaStore,
    RedisQuotaConfig, RedisQuotaStore, Remaining, StoreError,
};
pub use storage::SqliteStorage;
pub use usage::{InMemoryUsageRecorder, UsageRecord, UsageRecorder};
