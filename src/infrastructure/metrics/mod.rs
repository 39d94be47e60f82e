//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active realtime connection gauge
//! - Inbound event counts by event name and outcome
//! - Failed peer deliveries by reason
//! - Relayed messages dropped before storage

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Authenticated connections currently registered
pub static CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "connections_active",
            "Number of authenticated realtime connections",
        )
        .namespace("signal_server"),
    )
    .expect("Failed to create CONNECTIONS_ACTIVE metric")
});

/// Inbound events by name and outcome ("ok", "malformed", "failed")
pub static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_total", "Inbound realtime events processed").namespace("signal_server"),
        &["event", "outcome"],
    )
    .expect("Failed to create EVENTS_TOTAL metric")
});

/// Outbound events that could not be queued for a peer
pub static DELIVERY_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "delivery_failures_total",
            "Outbound events dropped before reaching a peer queue",
        )
        .namespace("signal_server"),
        &["reason"], // "stale", "full", "closed"
    )
    .expect("Failed to create DELIVERY_FAILURES_TOTAL metric")
});

/// Relayed messages dropped because the write queue was full or closed
pub static MESSAGES_NOT_STORED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "messages_not_stored_total",
            "Relayed messages dropped before reaching the message store",
        )
        .namespace("signal_server"),
    )
    .expect("Failed to create MESSAGES_NOT_STORED_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(EVENTS_TOTAL.clone()))
        .expect("Failed to register EVENTS_TOTAL");
    registry
        .register(Box::new(DELIVERY_FAILURES_TOTAL.clone()))
        .expect("Failed to register DELIVERY_FAILURES_TOTAL");
    registry
        .register(Box::new(MESSAGES_NOT_STORED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_NOT_STORED_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to update the connection gauge
pub fn set_connections(active: usize) {
    CONNECTIONS_ACTIVE.set(active as i64);
}

/// Helper to record one processed inbound event
pub fn record_event(event: &str, outcome: &str) {
    EVENTS_TOTAL.with_label_values(&[event, outcome]).inc();
}

/// Helper to record a dropped peer delivery
pub fn record_delivery_failure(reason: &str) {
    DELIVERY_FAILURES_TOTAL.with_label_values(&[reason]).inc();
}

/// Helper to record a relayed message that was not queued for storage
pub fn record_persist_dropped() {
    MESSAGES_NOT_STORED_TOTAL.inc();
}
