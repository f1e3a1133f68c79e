use super::types::{Counter, Histogram, LATENCY_BUCKETS_MS};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Label set: (key, value) pairs in the order they were given
pub type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// A counter per label set
#[derive(Debug, Default, Clone)]
pub struct LabeledCounter {
    entries: Arc<RwLock<BTreeMap<LabelKey, Counter>>>,
}

impl LabeledCounter {
    /// Create a new labeled counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1 for the given label set
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.inc_by(labels, 1);
    }

    /// Increment by `n` for the given label set
    pub fn inc_by(&self, labels: &[(&str, &str)], n: u64) {
        let key = label_key(labels);

        let counters = self.entries.read().unwrap_or_else(|e| e.into_inner());
        if let Some(counter) = counters.get(&key) {
            counter.inc_by(n);
            return;
        }
        drop(counters);

        let mut counters = self.entries.write().unwrap_or_else(|e| e.into_inner());
        counters.entry(key).or_default().inc_by(n);
    }

    /// Value for one label set (0 if never incremented)
    #[must_use]
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        let counters = self.entries.read().unwrap_or_else(|e| e.into_inner());
        counters.get(&label_key(labels)).map_or(0, Counter::get)
    }

    /// All (label set, value) pairs
    #[must_use]
    pub fn entries(&self) -> Vec<(LabelKey, u64)> {
        let counters = self.entries.read().unwrap_or_else(|e| e.into_inner());
        counters
            .iter()
            .map(|(labels, c)| (labels.clone(), c.get()))
            .collect()
    }
}

/// A histogram per label set
#[derive(Debug, Clone)]
pub struct LabeledHistogram {
    entries: Arc<RwLock<BTreeMap<LabelKey, Histogram>>>,
    bounds: Arc<[f64]>,
}

impl Default for LabeledHistogram {
    fn default() -> Self {
        Self::with_buckets(LATENCY_BUCKETS_MS)
    }
}

impl LabeledHistogram {
    /// Create with the default millisecond latency buckets
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom bucket bounds
    #[must_use]
    pub fn with_buckets(bounds: &[f64]) -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            bounds: bounds.into(),
        }
    }

    /// Observe a value for the given label set
    pub fn observe(&self, labels: &[(&str, &str)], value: f64) {
        let key = label_key(labels);

        let histograms = self.entries.read().unwrap_or_else(|e| e.into_inner());
        if let Some(h) = histograms.get(&key) {
            h.observe(value);
            return;
        }
        drop(histograms);

        let mut histograms = self.entries.write().unwrap_or_else(|e| e.into_inner());
        histograms
            .entry(key)
            .or_insert_with(|| Histogram::with_buckets(&self.bounds))
            .observe(value);
    }

    /// Histogram for one label set
    #[must_use]
    pub fn get(&self, labels: &[(&str, &str)]) -> Option<Histogram> {
        let histograms = self.entries.read().unwrap_or_else(|e| e.into_inner());
        histograms.get(&label_key(labels)).cloned()
    }

    /// All (label set, histogram) pairs
    #[must_use]
    pub fn entries(&self) -> Vec<(LabelKey, Histogram)> {
        let histograms = self.entries.read().unwrap_or_else(|e| e.into_inner());
        histograms
            .iter()
            .map(|(labels, h)| (labels.clone(), h.clone()))
            .collect()
    }
}

/// Prometheus label string: `{key1="val1",key2="val2"}`
#[must_use]
pub fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();
    format!("{{{}}}", parts.join(","))
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
