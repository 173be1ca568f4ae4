//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kvproxy_configs_total` (counter): configuration updates received
//! - `kvproxy_config_failures_total` (counter): updates rejected whole
//! - `kvproxy_pool_failures_total` (counter): malformed pools skipped
//! - `kvproxy_proxy_events_total` (counter): by event (started, start_failed, updated, shutdown)
//! - `kvproxy_proxies` (gauge): proxies in the registry, tombstones included
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The registry's own atomic counters stay authoritative

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_config_received() {
    counter!("kvproxy_configs_total").increment(1);
}

pub fn record_config_failure() {
    counter!("kvproxy_config_failures_total").increment(1);
}

pub fn record_pool_failure() {
    counter!("kvproxy_pool_failures_total").increment(1);
}

pub fn record_proxy_event(event: &'static str) {
    counter!("kvproxy_proxy_events_total", "event" => event).increment(1);
}

pub fn set_proxy_count(count: usize) {
    gauge!("kvproxy_proxies").set(count as f64);
}
