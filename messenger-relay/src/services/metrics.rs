//! Metrics collection for messenger-relay.
//!
//! HTTP request metrics come from the shared middleware through the
//! `metrics` recorder; relay-specific counters live in a Prometheus registry.
//! `/metrics` serves both.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static RELAY_METRICS: OnceLock<RelayMetrics> = OnceLock::new();

struct RelayMetrics {
    registry: Registry,
    events: IntCounterVec,
    provider_calls: IntCounterVec,
}

impl RelayMetrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let events = register_counter(
            &registry,
            "relay_events_total",
            "Messaging events handled, by outcome",
            &["outcome"],
        )?;
        let provider_calls = register_counter(
            &registry,
            "relay_provider_calls_total",
            "Outbound API calls, by provider and status",
            &["provider", "status"],
        )?;

        Ok(Self {
            registry,
            events,
            provider_calls,
        })
    }
}

fn register_counter(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<IntCounterVec> {
    let counter = IntCounterVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Install the global recorder and the relay counters. Call once at startup.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let relay_metrics = RelayMetrics::new().expect("Failed to register relay metrics");
    if RELAY_METRICS.set(relay_metrics).is_err() {
        panic!("relay metrics already initialized");
    }
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(relay_metrics) = RELAY_METRICS.get() {
        let mut buffer = Vec::new();
        if TextEncoder::new()
            .encode(&relay_metrics.registry.gather(), &mut buffer)
            .is_ok()
        {
            output.push_str(&String::from_utf8_lossy(&buffer));
        }
    }

    output
}

/// Record how a messaging event was handled.
pub fn record_event(outcome: &str) {
    if let Some(relay_metrics) = RELAY_METRICS.get() {
        relay_metrics.events.with_label_values(&[outcome]).inc();
    }
}

/// Record an outbound API call.
pub fn record_provider_call(provider: &str, status: &str) {
    if let Some(relay_metrics) = RELAY_METRICS.get() {
        relay_metrics
            .provider_calls
            .with_label_values(&[provider, status])
            .inc();
    }
}
