//! Prometheus metrics for monitoring the bingo server.
//!
//! Metrics are exported on the address given by `METRICS_BIND` in Prometheus
//! text format.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

/// Record a created session.
pub fn sessions_created_total() {
    metrics::counter!("sessions_created_total").increment(1);
}

/// Record a processed call request with its outcome tag.
pub fn calls_total(source: &str, outcome: &str) {
    metrics::counter!("calls_total",
        "source" => source.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a winning bingo check.
pub fn wins_total() {
    metrics::counter!("wins_total").increment(1);
}

/// Record a jackpot award settlement attempt.
pub fn jackpot_awards_total(success: bool) {
    metrics::counter!("jackpot_awards_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}
