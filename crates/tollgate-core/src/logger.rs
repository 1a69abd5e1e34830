//! Logging capability handed to handlers.

use std::fmt;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal operation.
    Info,
    /// Something unexpected but recoverable.
    Warn,
    /// A failure.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Structured logging sink tagged by correlation id.
///
/// Only [`log`](Self::log) is required; the event helpers format the
/// standard Tollgate event kinds on top of it.
pub trait LoggerHandle: Send + Sync + 'static {
    /// Emits a message for the given correlation id.
    fn log(&self, correlation_id: &str, message: &str, level: LogLevel);

    /// An inbound HTTP call was received.
    fn api_in(&self, correlation_id: &str, method: &str, path: &str) {
        self.log(
            correlation_id,
            &format!("[api-in] Received HTTP call [{method}] {path}"),
            LogLevel::Info,
        );
    }

    /// An outbound HTTP call to another service is about to be made.
    fn api_out(&self, correlation_id: &str, api: &str, method: &str, path: &str) {
        self.log(
            correlation_id,
            &format!("[api-out] Executing HTTP call to api [{api}] [{method}] {path}"),
            LogLevel::Info,
        );
    }

    /// An event was received from a topic.
    fn event_in(&self, correlation_id: &str, topic: &str) {
        self.log(
            correlation_id,
            &format!("[event-in] Received event from topic [{topic}]"),
            LogLevel::Info,
        );
    }

    /// An event is being published to a topic.
    fn event_out(&self, correlation_id: &str, topic: &str) {
        self.log(
            correlation_id,
            &format!("[event-out] Publishing event to topic [{topic}]"),
            LogLevel::Info,
        );
    }
}

/// A logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl LoggerHandle for NoopLogger {
    fn log(&self, _correlation_id: &str, _message: &str, _level: LogLevel) {}
}
