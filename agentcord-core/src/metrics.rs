// ABOUTME: Metric recording helpers over the `metrics` facade.
// ABOUTME: Without an installed recorder every call is a no-op.

use anyhow::{Context, Result};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `listen`.
///
/// Must be called from within a tokio runtime.
pub fn init_prometheus(listen: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .with_context(|| format!("Failed to start Prometheus exporter on {}", listen))?;
    tracing::info!(listen = %listen, "Prometheus metrics exporter started");
    Ok(())
}

pub fn record_message_received(platform: &'static str) {
    counter!("agentcord_messages_received_total", "platform" => platform).increment(1);
}

pub fn record_message_ignored(reason: &'static str) {
    counter!("agentcord_messages_ignored_total", "reason" => reason).increment(1);
}

pub fn record_message_rejected() {
    counter!("agentcord_messages_rejected_total").increment(1);
}

pub fn record_session_spawned(agent_type: &str) {
    counter!("agentcord_sessions_spawned_total", "agent_type" => agent_type.to_string())
        .increment(1);
}

pub fn record_session_destroyed() {
    counter!("agentcord_sessions_destroyed_total").increment(1);
}

pub fn set_active_sessions(count: usize) {
    gauge!("agentcord_active_sessions").set(count as f64);
}

/// Record one finished relay cycle
pub fn record_relay(outcome: &'static str, elapsed: Duration) {
    counter!("agentcord_relay_cycles_total", "outcome" => outcome).increment(1);
    histogram!("agentcord_relay_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

pub fn record_reply_sent() {
    counter!("agentcord_replies_sent_total").increment(1);
}

pub fn record_error(kind: &'static str) {
    counter!("agentcord_errors_total", "kind" => kind).increment(1);
}
