use super::*;
use chatgate_llm::{DispatchAttempt, ProviderFailure};
use std::time::Duration;

#[test]
fn test_counter_and_gauge() {
    let counter = Counter::new();
    counter.inc();
    counter.inc_by(4);
    assert_eq!(counter.get(), 5);

    let gauge = Gauge::new();
    gauge.inc();
    gauge.inc();
    gauge.dec();
    assert_eq!(gauge.get(), 1);
    gauge.set(-3);
    assert_eq!(gauge.get(), -3);
}

#[test]
fn test_histogram_buckets_are_cumulative() {
    let histogram = Histogram::with_buckets(&[10.0, 50.0, 100.0]);
    for value in [5.0, 25.0, 75.0, 150.0] {
        histogram.observe(value);
    }

    assert_eq!(histogram.count(), 4);
    assert_eq!(histogram.sum(), 255.0);
    assert_eq!(
        histogram.bucket_counts(),
        vec![(10.0, 1), (50.0, 2), (100.0, 3)]
    );
}

#[test]
fn test_registry_returns_shared_handles() {
    let registry = MetricsRegistry::new();
    registry.counter("hits").inc();
    registry.counter("hits").inc();
    assert_eq!(registry.counter("hits").get(), 2);

    let cloned = registry.clone();
    cloned.labeled_counter("by_kind").inc(&[("kind", "a")]);
    assert_eq!(registry.labeled_counter("by_kind").get(&[("kind", "a")]), 1);
}

#[test]
fn test_prometheus_export_format() {
    let registry = MetricsRegistry::new();
    registry.describe("chatgate_test_total", "Test counter");
    registry.counter("chatgate_test_total").inc_by(3);
    registry
        .labeled_counter("chatgate_outcomes_total")
        .inc(&[("outcome", "allowed")]);
    registry
        .labeled_histogram("chatgate_latency_ms")
        .observe(&[("provider", "ollama")], 12.0);

    let text = registry.export_prometheus();

    assert!(text.contains("# HELP chatgate_test_total Test counter\n"));
    assert!(text.contains("# TYPE chatgate_test_total counter\nchatgate_test_total 3\n"));
    assert!(text.contains("chatgate_outcomes_total{outcome=\"allowed\"} 1\n"));
    assert!(text.contains("chatgate_latency_ms_bucket{provider=\"ollama\",le=\"25\"} 1\n"));
    assert!(text.contains("chatgate_latency_ms_bucket{provider=\"ollama\",le=\"+Inf\"} 1\n"));
    assert!(text.contains("chatgate_latency_ms_count{provider=\"ollama\"} 1\n"));
}

#[test]
fn test_label_values_are_escaped() {
    let registry = MetricsRegistry::new();
    registry
        .labeled_counter("odd_total")
        .inc(&[("provider", "a\"b")]);
    assert!(registry
        .export_prometheus()
        .contains("odd_total{provider=\"a\\\"b\"} 1"));
}

#[test]
fn test_gateway_metrics_observe_attempt() {
    let metrics = GatewayMetrics::default();
    metrics.observe_attempt(&DispatchAttempt {
        provider: "ollama".to_string(),
        success: false,
        latency: Duration::from_millis(40),
        error: Some(ProviderFailure::Timeout(40)),
    });
    metrics.observe_attempt(&DispatchAttempt {
        provider: "gemini".to_string(),
        success: true,
        latency: Duration::from_millis(300),
        error: None,
    });

    assert_eq!(
        metrics
            .dispatch_attempts
            .get(&[("provider", "ollama"), ("status", "failure")]),
        1
    );
    assert_eq!(
        metrics
            .dispatch_attempts
            .get(&[("provider", "gemini"), ("status", "success")]),
        1
    );
    let latency = metrics.provider_latency.get(&[("provider", "gemini")]).unwrap();
    assert_eq!(latency.count(), 1);
    assert!(metrics
        .registry()
        .export_prometheus()
        .contains("# TYPE chatgate_dispatch_attempts_total counter"));
}
