//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connection gauge
//! - Messages received over realtime connections
//! - Broadcast fan-out counts and per-connection delivery failures

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace("realtime_chat"),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Total chat messages received over realtime connections
pub static MESSAGES_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "messages_received_total",
            "Chat messages received over realtime connections",
        )
        .namespace("realtime_chat"),
    )
    .expect("Failed to create MESSAGES_RECEIVED_TOTAL metric")
});

/// Total frames delivered by the broadcaster
pub static BROADCAST_DELIVERIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "broadcast_deliveries_total",
            "Frames delivered to individual connections by the broadcaster",
        )
        .namespace("realtime_chat"),
    )
    .expect("Failed to create BROADCAST_DELIVERIES_TOTAL metric")
});

/// Per-connection delivery failures during broadcast
pub static BROADCAST_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "broadcast_failures_total",
            "Per-connection delivery failures during broadcast",
        )
        .namespace("realtime_chat"),
    )
    .expect("Failed to create BROADCAST_FAILURES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(MESSAGES_RECEIVED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_RECEIVED_TOTAL");
    registry
        .register(Box::new(BROADCAST_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register BROADCAST_DELIVERIES_TOTAL");
    registry
        .register(Box::new(BROADCAST_FAILURES_TOTAL.clone()))
        .expect("Failed to register BROADCAST_FAILURES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Force lazy initialization
        let _ = &*REGISTRY;
        let _ = &*WEBSOCKET_CONNECTIONS_ACTIVE;
        let _ = &*MESSAGES_RECEIVED_TOTAL;
        let _ = &*BROADCAST_DELIVERIES_TOTAL;
        let _ = &*BROADCAST_FAILURES_TOTAL;
    }

    #[test]
    fn test_gather_metrics() {
        MESSAGES_RECEIVED_TOTAL.inc();
        let metrics = gather_metrics();
        assert!(metrics.contains("messages_received_total"));
    }
}
