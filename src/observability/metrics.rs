//! Agent metrics.
//!
//! # Metrics
//! - `agent_intercepted_calls_total` (counter): calls routed through a proxy, by module
//! - `agent_hook_failures_total` (counter): failed hooks, by hook
//! - `agent_transformations_total` (counter): transformer runs, by outcome
//! - `agent_spans_exported_total` (counter): spans accepted by an exporter
//! - `agent_enhancer_instances` (gauge): cached enhancer instances
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users
//!   and tests pay nothing
//! - Only the demo binary installs the Prometheus exporter

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter started");
    Ok(())
}

pub fn record_intercepted_call(module: &str) {
    counter!("agent_intercepted_calls_total", "module" => module.to_string()).increment(1);
}

pub fn record_hook_failure(hook: &'static str) {
    counter!("agent_hook_failures_total", "hook" => hook).increment(1);
}

/// `outcome` is one of `installed`, `skipped`, `failed`.
pub fn record_transformation(outcome: &'static str) {
    counter!("agent_transformations_total", "outcome" => outcome).increment(1);
}

pub fn record_spans_exported(count: usize) {
    counter!("agent_spans_exported_total").increment(count as u64);
}

pub fn record_enhancer_instances(count: usize) {
    gauge!("agent_enhancer_instances").set(count as f64);
}
