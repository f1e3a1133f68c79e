use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

/// Quota subject for one UTC calendar day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuotaKey {
    identity: String,
    day: NaiveDate,
}

impl QuotaKey {
    /// Key for an identity on a given day
    #[must_use]
    pub fn new(identity: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            identity: identity.into(),
            day,
        }
    }

    /// Key for the UTC day containing `at`
    #[must_use]
    pub fn at(identity: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(identity, at.date_naive())
    }

    /// Caller identity
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Counter key: `rate_limit:{identity}:{YYYY-MM-DD}`
    #[must_use]
    pub fn counter_key(&self) -> String {
        format!("rate_limit:{}:{}", self.identity, self.day.format("%Y-%m-%d"))
    }

    /// Audit hash key: `usage:{identity}:{YYYY-MM-DD}`
    #[must_use]
    pub fn audit_key(&self) -> String {
        format!("usage:{}:{}", self.identity, self.day.format("%Y-%m-%d"))
    }
}

impl fmt::Display for QuotaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.counter_key())
    }
}
