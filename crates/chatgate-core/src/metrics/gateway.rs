use super::labeled::{LabeledCounter, LabeledHistogram};
use super::registry::MetricsRegistry;
use super::types::{Counter, Gauge};
use chatgate_llm::DispatchAttempt;

/// Handles to every series the request path records
#[derive(Debug, Clone)]
pub struct GatewayMetrics {
    registry: MetricsRegistry,
    /// `chatgate_admissions_total{outcome}`
    pub admissions: LabeledCounter,
    /// `chatgate_quota_store_unavailable_total`
    pub quota_store_unavailable: Counter,
    /// `chatgate_dispatch_attempts_total{provider,status}`
    pub dispatch_attempts: LabeledCounter,
    /// `chatgate_provider_latency_ms{provider}`
    pub provider_latency: LabeledHistogram,
    /// `chatgate_requests_total{outcome}`
    pub requests: LabeledCounter,
    /// `chatgate_usage_record_failures_total`
    pub usage_record_failures: Counter,
    /// `chatgate_requests_in_flight`
    pub in_flight: Gauge,
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new(&MetricsRegistry::new())
    }
}

impl GatewayMetrics {
    /// Register the gateway series in `registry`
    #[must_use]
    pub fn new(registry: &MetricsRegistry) -> Self {
        let series = [
            ("chatgate_admissions_total", "Admission decisions by outcome"),
            (
                "chatgate_quota_store_unavailable_total",
                "Admissions that failed open because the quota store was unreachable",
            ),
            (
                "chatgate_dispatch_attempts_total",
                "Provider calls by provider and status",
            ),
            ("chatgate_provider_latency_ms", "Provider call latency in milliseconds"),
            ("chatgate_requests_total", "Generate requests by final outcome"),
            (
                "chatgate_usage_record_failures_total",
                "Served requests whose usage record could not be written",
            ),
            ("chatgate_requests_in_flight", "Generate requests currently being handled"),
        ];
        for (name, help) in series {
            registry.describe(name, help);
        }

        Self {
            admissions: registry.labeled_counter("chatgate_admissions_total"),
            quota_store_unavailable: registry.counter("chatgate_quota_store_unavailable_total"),
            dispatch_attempts: registry.labeled_counter("chatgate_dispatch_attempts_total"),
            provider_latency: registry.labeled_histogram("chatgate_provider_latency_ms"),
            requests: registry.labeled_counter("chatgate_requests_total"),
            usage_record_failures: registry.counter("chatgate_usage_record_failures_total"),
            in_flight: registry.gauge("chatgate_requests_in_flight"),
            registry: registry.clone(),
        }
    }

    /// Registry these handles belong to
    #[must_use]
    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Record one provider call
    pub fn observe_attempt(&self, attempt: &DispatchAttempt) {
        let status = if attempt.success { "success" } else { "failure" };
        self.dispatch_attempts
            .inc(&[("provider", attempt.provider.as_str()), ("status", status)]);
        self.provider_latency.observe(
            &[("provider", attempt.provider.as_str())],
            attempt.latency.as_secs_f64() * 1000.0,
        );
    }
}
