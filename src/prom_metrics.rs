//! # Prometheus Metrics — Exposition for Scraping
//!
//! Exposes lottocover service metrics in the OpenMetrics text format on
//! `GET /metrics`.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `lottocover_http_request_duration_seconds` | Histogram | `method`, `path` | HTTP latency |
//! | `lottocover_optimizer_runs_total` | Counter | `endpoint`, `mode` | Optimizer calls started |
//! | `lottocover_optimizer_failures_total` | Counter | `endpoint`, `kind` | Failed calls by error kind |
//! | `lottocover_optimizer_duration_seconds` | Histogram | `endpoint` | Optimizer wall time |
//! | `lottocover_tickets_generated_total` | Counter | `endpoint` | Tickets returned to callers |
//!
//! Counters get the `_total` suffix from the encoder.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RunLabel {
    pub endpoint: String,
    pub mode: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FailureLabel {
    pub endpoint: String,
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EndpointLabel {
    pub endpoint: String,
}

type HistogramFamily<L> = Family<L, Histogram, fn() -> Histogram>;

fn http_histogram() -> Histogram {
    // 1 ms .. ~4 s
    Histogram::new(exponential_buckets(0.001, 2.0, 13))
}

fn optimizer_histogram() -> Histogram {
    // 1 ms .. ~65 s
    Histogram::new(exponential_buckets(0.001, 2.0, 17))
}

/// Service metrics. Every field is atomic and safe to update from any task.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: HistogramFamily<HttpLabel>,
    pub optimizer_runs: Family<RunLabel, Counter>,
    pub optimizer_failures: Family<FailureLabel, Counter>,
    pub optimizer_duration: HistogramFamily<EndpointLabel>,
    pub tickets_generated: Family<EndpointLabel, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration: HistogramFamily<HttpLabel> =
            Family::new_with_constructor(http_histogram);
        registry.register(
            "lottocover_http_request_duration_seconds",
            "HTTP request latency by method and path",
            http_request_duration.clone(),
        );

        let optimizer_runs = Family::<RunLabel, Counter>::default();
        registry.register(
            "lottocover_optimizer_runs",
            "Optimizer calls by endpoint and mode",
            optimizer_runs.clone(),
        );

        let optimizer_failures = Family::<FailureLabel, Counter>::default();
        registry.register(
            "lottocover_optimizer_failures",
            "Failed optimizer calls by endpoint and error kind",
            optimizer_failures.clone(),
        );

        let optimizer_duration: HistogramFamily<EndpointLabel> =
            Family::new_with_constructor(optimizer_histogram);
        registry.register(
            "lottocover_optimizer_duration_seconds",
            "Optimizer wall time by endpoint",
            optimizer_duration.clone(),
        );

        let tickets_generated = Family::<EndpointLabel, Counter>::default();
        registry.register(
            "lottocover_tickets_generated",
            "Tickets returned to callers by endpoint",
            tickets_generated.clone(),
        );

        Self {
            registry,
            http_request_duration,
            optimizer_runs,
            optimizer_failures,
            optimizer_duration,
            tickets_generated,
        }
    }

    pub fn record_run(&self, endpoint: &str, mode: &str) {
        self.optimizer_runs
            .get_or_create(&RunLabel {
                endpoint: endpoint.to_string(),
                mode: mode.to_string(),
            })
            .inc();
    }

    pub fn record_failure(&self, endpoint: &str, kind: &str) {
        self.optimizer_failures
            .get_or_create(&FailureLabel {
                endpoint: endpoint.to_string(),
                kind: kind.to_string(),
            })
            .inc();
    }

    pub fn record_success(&self, endpoint: &str, seconds: f64, tickets: usize) {
        let label = EndpointLabel {
            endpoint: endpoint.to_string(),
        };
        self.optimizer_duration.get_or_create(&label).observe(seconds);
        self.tickets_generated
            .get_or_create(&label)
            .inc_by(tickets as u64);
    }

    /// Render all metrics in OpenMetrics text format. An encoding failure
    /// yields whatever was written before it.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        if let Err(e) = encode(&mut buf, &self.registry) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_lists_registered_families() {
        let m = Metrics::new();
        m.record_run("greedy", "classic");
        m.record_success("greedy", 0.25, 4);
        let output = m.encode();
        assert!(output.contains("lottocover_optimizer_runs_total"));
        assert!(output.contains("lottocover_tickets_generated_total"));
        assert!(output.contains("lottocover_optimizer_duration_seconds"));
        assert!(output.contains("mode=\"classic\""));
    }

    #[test]
    fn failures_are_labelled_by_kind() {
        let m = Metrics::new();
        m.record_failure("budget", "invalid_budget");
        m.record_failure("budget", "invalid_budget");
        let output = m.encode();
        assert!(output.contains("kind=\"invalid_budget\""));
        assert!(output.contains("lottocover_optimizer_failures_total{endpoint=\"budget\",kind=\"invalid_budget\"} 2"));
    }

    #[test]
    fn http_histogram_records_observations() {
        let m = Metrics::new();
        m.http_request_duration
            .get_or_create(&HttpLabel {
                method: "POST".into(),
                path: "/greedy".into(),
            })
            .observe(0.01);
        let output = m.encode();
        assert!(output.contains("lottocover_http_request_duration_seconds_count"));
        assert!(output.contains("path=\"/greedy\""));
    }
}
