//! Request metrics.
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, so the dispatcher can record unconditionally.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter is installed.
    pub enabled: bool,

    /// Address the exporter listens on.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Installs the Prometheus exporter.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for a bad address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Renders the current metrics in Prometheus text format.
///
/// Returns `None` if the exporter is not installed.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!("tollgate_requests_total", "Total number of requests");
    describe_histogram!(
        "tollgate_request_duration_seconds",
        metrics::Unit::Seconds,
        "Request duration"
    );
    describe_counter!(
        "tollgate_auth_failures_total",
        "Credentials rejected by verification"
    );
    describe_counter!(
        "tollgate_upload_bytes_total",
        metrics::Unit::Bytes,
        "Bytes staged by upload routes"
    );
}

/// Records a completed request.
pub fn record_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    counter!(
        "tollgate_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "tollgate_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Records a rejected credential.
pub fn record_auth_failure(reason: &'static str) {
    counter!("tollgate_auth_failures_total", "reason" => reason).increment(1);
}

/// Records bytes staged by an upload route.
pub fn record_upload(route: &str, bytes: u64) {
    counter!("tollgate_upload_bytes_total", "route" => route.to_string()).increment(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", "/games", 200, Duration::from_millis(12));
        record_auth_failure("expired");
        record_upload("/games/kud/upload", 1024);
        assert!(render_metrics().is_none());
    }

    #[test]
    fn test_disabled_metrics_skip_install() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }
}
