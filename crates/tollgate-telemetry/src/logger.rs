//! `tracing`-backed implementation of the logger capability.

use std::sync::Arc;
use tollgate_core::{LogLevel, LoggerHandle};

/// Emits [`LoggerHandle`] entries as `tracing` events.
///
/// Every event carries `correlation_id`, `service` and `kind` fields, so the
/// JSON output can be filtered per call and per event kind.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    service: Arc<str>,
}

impl TracingLogger {
    /// Creates a logger for the named service.
    #[must_use]
    pub fn new(service: impl Into<Arc<str>>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The service name stamped on every entry.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    fn emit(&self, kind: &str, correlation_id: &str, message: &str, level: LogLevel) {
        let service = &*self.service;
        match level {
            LogLevel::Debug => {
                tracing::debug!(correlation_id, service, kind, "{message}");
            }
            LogLevel::Info => {
                tracing::info!(correlation_id, service, kind, "{message}");
            }
            LogLevel::Warn => {
                tracing::warn!(correlation_id, service, kind, "{message}");
            }
            LogLevel::Error => {
                tracing::error!(correlation_id, service, kind, "{message}");
            }
        }
    }
}

impl LoggerHandle for TracingLogger {
    fn log(&self, correlation_id: &str, message: &str, level: LogLevel) {
        self.emit("compute", correlation_id, message, level);
    }

    fn api_in(&self, correlation_id: &str, method: &str, path: &str) {
        self.emit(
            "api-in",
            correlation_id,
            &format!("Received HTTP call [{method}] {path}"),
            LogLevel::Info,
        );
    }

    fn api_out(&self, correlation_id: &str, api: &str, method: &str, path: &str) {
        self.emit(
            "api-out",
            correlation_id,
            &format!("Executing HTTP call to api [{api}] [{method}] {path}"),
            LogLevel::Info,
        );
    }

    fn event_in(&self, correlation_id: &str, topic: &str) {
        self.emit(
            "event-in",
            correlation_id,
            &format!("Received event from topic [{topic}]"),
            LogLevel::Info,
        );
    }

    fn event_out(&self, correlation_id: &str, topic: &str) {
        self.emit(
            "event-out",
            correlation_id,
            &format!("Publishing event to topic [{topic}]"),
            LogLevel::Info,
        );
    }
}
