//! Metrics collection for observability
//!
//! Lightweight in-process metrics with Prometheus text export. The registry
//! is constructed at startup and passed to the components that record into
//! it; there is no process-global instance.

mod gateway;
mod labeled;
mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use gateway::GatewayMetrics;
pub use labeled::{LabelKey, LabeledCounter, LabeledHistogram};
pub use registry::MetricsRegistry;
pub use types::{Counter, Gauge, Histogram};
