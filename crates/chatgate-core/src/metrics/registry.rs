use super::labeled::{format_labels, LabelKey, LabeledCounter, LabeledHistogram};
use super::types::{Counter, Gauge, Histogram};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, RwLock};

type Family<T> = Arc<RwLock<BTreeMap<String, T>>>;

fn get_or_create<T: Clone + Default>(family: &Family<T>, name: &str) -> T {
    let read = family.read().unwrap_or_else(|e| e.into_inner());
    if let Some(metric) = read.get(name) {
        return metric.clone();
    }
    drop(read);

    let mut write = family.write().unwrap_or_else(|e| e.into_inner());
    write.entry(name.to_string()).or_default().clone()
}

/// Metrics registry: named metrics, created on first use, exported sorted by name
#[derive(Debug, Default, Clone)]
pub struct MetricsRegistry {
    help: Family<String>,
    counters: Family<Counter>,
    gauges: Family<Gauge>,
    labeled_counters: Family<LabeledCounter>,
    labeled_histograms: Family<LabeledHistogram>,
}

impl MetricsRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a `# HELP` line to a metric name
    pub fn describe(&self, name: &str, help: &str) {
        let mut map = self.help.write().unwrap_or_else(|e| e.into_inner());
        map.insert(name.to_string(), help.to_string());
    }

    /// Get or create a counter
    pub fn counter(&self, name: &str) -> Counter {
        get_or_create(&self.counters, name)
    }

    /// Get or create a gauge
    pub fn gauge(&self, name: &str) -> Gauge {
        get_or_create(&self.gauges, name)
    }

    /// Get or create a labeled counter
    pub fn labeled_counter(&self, name: &str) -> LabeledCounter {
        get_or_create(&self.labeled_counters, name)
    }

    /// Get or create a labeled histogram
    pub fn labeled_histogram(&self, name: &str) -> LabeledHistogram {
        get_or_create(&self.labeled_histograms, name)
    }

    /// Export every metric in Prometheus text format
    #[must_use]
    pub fn export_prometheus(&self) -> String {
        let help = self.help.read().unwrap_or_else(|e| e.into_inner());
        let mut out = String::new();

        let header = |out: &mut String, name: &str, kind: &str| {
            if let Some(text) = help.get(name) {
                let _ = writeln!(out, "# HELP {} {}", name, text);
            }
            let _ = writeln!(out, "# TYPE {} {}", name, kind);
        };

        for (name, counter) in self.counters.read().unwrap_or_else(|e| e.into_inner()).iter() {
            header(&mut out, name, "counter");
            let _ = writeln!(out, "{} {}", name, counter.get());
        }

        for (name, gauge) in self.gauges.read().unwrap_or_else(|e| e.into_inner()).iter() {
            header(&mut out, name, "gauge");
            let _ = writeln!(out, "{} {}", name, gauge.get());
        }

        for (name, lc) in self
            .labeled_counters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
        {
            header(&mut out, name, "counter");
            for (labels, value) in lc.entries() {
                let _ = writeln!(out, "{}{} {}", name, format_labels(&labels), value);
            }
        }

        for (name, lh) in self
            .labeled_histograms
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
        {
            header(&mut out, name, "histogram");
            for (labels, histogram) in lh.entries() {
                write_histogram(&mut out, name, &labels, &histogram);
            }
        }

        out
    }
}

fn write_histogram(out: &mut String, name: &str, labels: &[(String, String)], histogram: &Histogram) {
    let with_le = |le: String| {
        let mut all: LabelKey = labels.to_vec();
        all.push(("le".to_string(), le));
        format_labels(&all)
    };

    for (bound, count) in histogram.bucket_counts() {
        let _ = writeln!(out, "{}_bucket{} {}", name, with_le(bound.to_string()), count);
    }
    let _ = writeln!(
        out,
        "{}_bucket{} {}",
        name,
        with_le("+Inf".to_string()),
        histogram.count()
    );
    let _ = writeln!(out, "{}_sum{} {}", name, format_labels(labels), histogram.sum());
    let _ = writeln!(out, "{}_count{} {}", name, format_labels(labels), histogram.count());
}
