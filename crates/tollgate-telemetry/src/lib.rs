//! Logging and metrics for Tollgate services.
//!
//! - [`logging`] installs the process-wide `tracing` subscriber (JSON in
//!   production, pretty output in development)
//! - [`TracingLogger`] is the [`LoggerHandle`](tollgate_core::LoggerHandle)
//!   handed to handlers; every entry carries the correlation id
//! - [`metrics`] records request counters and latencies, with an optional
//!   Prometheus exporter
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `tollgate_requests_total` | Counter | `method`, `route`, `status` |
//! | `tollgate_request_duration_seconds` | Histogram | `method`, `route` |
//! | `tollgate_auth_failures_total` | Counter | `reason` |
//! | `tollgate_upload_bytes_total` | Counter | `route` |

#![doc(html_root_url = "https://docs.rs/tollgate-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod logger;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logger::TracingLogger;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
