//! Admission gate
//!
//! Check-before-increment: a caller at or over the daily limit is denied
//! without touching the counter, so repeated denials never inflate it. The
//! check and increment are one atomic store operation.
//!
//! When the store cannot be reached the gate fails open and reports the
//! remaining quota as unknown.

use super::key::QuotaKey;
use super::store::{AuditEntry, QuotaStore, StoreError};
use crate::metrics::GatewayMetrics;
use chatgate_llm::util::mask_api_key;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of "now" for day bucketing
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Remaining daily quota as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    /// Requests left today
    Known(u64),
    /// The store was unavailable; the count is unknown
    Unknown,
}

impl Remaining {
    /// The count, if known
    #[must_use]
    pub fn known(self) -> Option<u64> {
        match self {
            Self::Known(n) => Some(n),
            Self::Unknown => None,
        }
    }
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.known().serialize(serializer)
    }
}

/// Admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Admission {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Quota left after this decision
    pub remaining: Remaining,
}

impl Admission {
    fn denied() -> Self {
        Self {
            allowed: false,
            remaining: Remaining::Known(0),
        }
    }

    fn fail_open() -> Self {
        Self {
            allowed: true,
            remaining: Remaining::Unknown,
        }
    }
}

/// Quota admission over a shared store
pub struct AdmissionGate {
    store: Arc<dyn QuotaStore>,
    metrics: GatewayMetrics,
    clock: Clock,
}

impl AdmissionGate {
    /// Create a gate using the system clock
    #[must_use]
    pub fn new(store: Arc<dyn QuotaStore>, metrics: GatewayMetrics) -> Self {
        Self {
            store,
            metrics,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Underlying store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn QuotaStore> {
        &self.store
    }

    /// Current time according to the gate's clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Current UTC day bucket
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Decide whether `identity` may make one more request today.
    ///
    /// Never fails: store errors are absorbed as a fail-open admission.
    pub async fn admit(&self, identity: &str, daily_limit: u64, source: &str) -> Admission {
        let now = self.now();
        let key = QuotaKey::at(identity, now);
        let masked = mask_api_key(identity);

        if daily_limit == 0 {
            debug!(caller = %masked, "Daily limit is zero, denying");
            self.metrics.admissions.inc(&[("outcome", "denied")]);
            return Admission::denied();
        }

        let admission = match self
            .store
            .increment_below(&key.counter_key(), daily_limit)
            .await
        {
            Ok(Some(count)) => {
                self.write_audit(&key, count, source, now).await;
                Admission {
                    allowed: true,
                    remaining: Remaining::Known(daily_limit.saturating_sub(count)),
                }
            }
            Ok(None) => {
                debug!(caller = %masked, limit = daily_limit, "Daily quota exhausted");
                Admission::denied()
            }
            Err(err) => {
                self.on_store_error(&masked, &err);
                Admission::fail_open()
            }
        };

        let outcome = match (admission.allowed, admission.remaining) {
            (false, _) => "denied",
            (true, Remaining::Unknown) => "fail_open",
            (true, Remaining::Known(_)) => "allowed",
        };
        self.metrics.admissions.inc(&[("outcome", outcome)]);
        admission
    }

    /// Requests already counted today, without incrementing
    pub async fn used_today(&self, identity: &str) -> Result<u64, StoreError> {
        let key = QuotaKey::at(identity, self.now());
        self.store.get(&key.counter_key()).await
    }

    async fn write_audit(&self, key: &QuotaKey, count: u64, source: &str, now: DateTime<Utc>) {
        let entry = AuditEntry {
            count,
            ip: source.to_string(),
            timestamp: now,
        };
        if let Err(err) = self.store.record_audit(&key.audit_key(), &entry).await {
            warn!(
                caller = %mask_api_key(key.identity()),
                error = %err,
                "Failed to write quota audit entry"
            );
        }
    }

    fn on_store_error(&self, masked: &str, err: &StoreError) {
        warn!(
            caller = %masked,
            backend = self.store.backend(),
            error = %err,
            "Quota store unavailable, failing open"
        );
        self.metrics.quota_store_unavailable.inc();
    }
}
