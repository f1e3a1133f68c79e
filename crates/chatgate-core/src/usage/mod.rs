//! Usage records - one audit row per served request

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A successfully served request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Caller identity (API key)
    pub identity: String,
    /// When the response was produced
    pub timestamp: DateTime<Utc>,
    /// Prompt text
    pub message: String,
    /// Generated text
    pub response: String,
    /// `"{provider}:{model}"`
    pub provider_used: String,
    /// Client address
    pub source_address: String,
}

/// Sink for usage records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    /// Persist one record
    async fn record(&self, record: &UsageRecord) -> Result<()>;
}

/// Recorder that keeps records in memory
///
/// Unbounded by default. A bounded recorder drops the oldest record once
/// `capacity` is reached.
#[derive(Debug, Default)]
pub struct InMemoryUsageRecorder {
    records: Mutex<VecDeque<UsageRecord>>,
    capacity: Option<usize>,
}

impl InMemoryUsageRecorder {
    /// Create an empty, unbounded recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder that keeps at most `capacity` records
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: Some(capacity),
        }
    }

    /// Snapshot of the retained records, oldest first
    #[must_use]
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Number of retained records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageRecorder for InMemoryUsageRecorder {
    async fn record(&self, record: &UsageRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Ok(());
            }
            while records.len() >= capacity {
                records.pop_front();
            }
        }
        records.push_back(record.clone());
        Ok(())
    }
}
