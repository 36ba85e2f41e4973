//! Prometheus metrics for the relay.
//!
//! The recorder is installed once per process; [`render`] produces the text
//! exposition served on `/metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> &'static PrometheusHandle {
    HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            // Another recorder owns the global slot; keep a detached one so
            // rendering still works.
            warn!("Prometheus recorder not installed: {}", e);
            PrometheusBuilder::new().build_recorder().handle()
        }
    })
}

/// Current metrics in Prometheus text format.
pub fn render() -> String {
    init().render()
}

/// Count a finished relay request by response kind and status.
pub fn record_request(kind: &'static str, status: u16) {
    ::metrics::counter!(
        "hlsrelay_requests_total",
        "kind" => kind,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_duration(kind: &'static str, start: Instant) {
    ::metrics::histogram!("hlsrelay_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

/// Count one upstream attempt by variant label and resulting status.
pub fn record_attempt(variant: &str, status: u16) {
    ::metrics::counter!(
        "hlsrelay_upstream_attempts_total",
        "variant" => variant.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_bytes_relayed(bytes: usize) {
    ::metrics::counter!("hlsrelay_bytes_relayed_total").increment(bytes as u64);
}

pub fn record_stream_error() {
    ::metrics::counter!("hlsrelay_stream_errors_total").increment(1);
}
