//! Response shaping.
//!
//! The shaper is the only place a [`GateError`] becomes a wire response:
//!
//! | Failure | Status | Body |
//! |---------|--------|------|
//! | `Validation` | carried (4xx) | `{code, message, subcode?}` |
//! | `Runtime` | carried | `{code, message}` |
//! | `Unclassified` | 500 | `{code: 500, message: "Internal Server Error"}` |
//!
//! Successful JSON results are sent verbatim with `200 OK`. Every outcome is
//! logged exactly once with the call's correlation id, and every response
//! carries the CORS headers and echoes `x-correlation-id`.

use crate::cors::CorsPolicy;
use crate::types::{full_body, stream_body, Response, ResponseBody};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use std::sync::Arc;
use tollgate_core::headers::CORRELATION_ID;
use tollgate_core::{ByteStream, CorrelationId, GateError, LogLevel, LoggerHandle};

const JSON: &str = "application/json";
const FALLBACK_BODY: &str = r#"{"code":500,"message":"Internal Server Error"}"#;

/// What a handler produced.
pub enum Reply {
    /// A JSON document, sent verbatim.
    Json(serde_json::Value),
    /// A byte stream with an optional content type.
    Stream {
        /// The response body.
        body: ByteStream,
        /// `content-type` of the stream.
        content_type: Option<String>,
    },
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Stream { content_type, .. } => f
                .debug_struct("Stream")
                .field("content_type", content_type)
                .finish_non_exhaustive(),
        }
    }
}

/// The identifying line of a call, used to tag the outcome log entry.
#[derive(Debug, Clone, Copy)]
pub struct CallLine<'a> {
    /// Correlation id of the call.
    pub correlation_id: &'a CorrelationId,
    /// Request method.
    pub method: &'a Method,
    /// Request path.
    pub path: &'a str,
}

/// Turns call outcomes into responses.
#[derive(Clone)]
pub struct ResponseShaper {
    logger: Arc<dyn LoggerHandle>,
    cors: CorsPolicy,
}

impl ResponseShaper {
    /// Creates a shaper logging through `logger`.
    #[must_use]
    pub fn new(logger: Arc<dyn LoggerHandle>, cors: CorsPolicy) -> Self {
        Self { logger, cors }
    }

    /// The CORS policy applied to every response.
    #[must_use]
    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    /// Shapes any outcome.
    pub fn shape(&self, call: &CallLine<'_>, outcome: Result<Reply, GateError>) -> Response {
        match outcome {
            Ok(Reply::Json(value)) => self.success(call, &value),
            Ok(Reply::Stream { body, content_type }) => {
                self.stream(call, body, content_type.as_deref())
            }
            Err(err) => self.failure(call, &err),
        }
    }

    /// `200 OK` with the JSON document verbatim.
    pub fn success(&self, call: &CallLine<'_>, value: &serde_json::Value) -> Response {
        self.log_outcome(call, StatusCode::OK, LogLevel::Info, "completed");
        self.finish(call, StatusCode::OK, Some(JSON), full_body(value.to_string()))
    }

    /// `200 OK` with a streamed body.
    pub fn stream(
        &self,
        call: &CallLine<'_>,
        body: ByteStream,
        content_type: Option<&str>,
    ) -> Response {
        self.log_outcome(call, StatusCode::OK, LogLevel::Info, "streaming");
        self.finish(call, StatusCode::OK, content_type, stream_body(body))
    }

    /// The failure envelope for `err`.
    pub fn failure(&self, call: &CallLine<'_>, err: &GateError) -> Response {
        let status = err.status_code();
        match err {
            GateError::Unclassified { .. } => {
                self.log_outcome(call, status, LogLevel::Error, &err.detail());
            }
            GateError::Runtime { .. } if status.is_server_error() => {
                self.log_outcome(call, status, LogLevel::Error, &err.to_string());
            }
            _ => self.log_outcome(call, status, LogLevel::Warn, &err.to_string()),
        }

        let body = serde_json::to_string(&err.to_body()).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to encode failure envelope");
            FALLBACK_BODY.to_string()
        });
        self.finish(call, status, Some(JSON), full_body(body))
    }

    /// Answers an `OPTIONS` preflight. Preflights are not validated or logged.
    #[must_use]
    pub fn preflight(&self) -> Response {
        self.cors.preflight()
    }

    fn log_outcome(&self, call: &CallLine<'_>, status: StatusCode, level: LogLevel, what: &str) {
        self.logger.log(
            call.correlation_id.as_str(),
            &format!(
                "[{}] {} -> {}: {what}",
                call.method,
                call.path,
                status.as_u16()
            ),
            level,
        );
    }

    fn finish(
        &self,
        call: &CallLine<'_>,
        status: StatusCode,
        content_type: Option<&str>,
        body: ResponseBody,
    ) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = status;

        let headers = response.headers_mut();
        if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
            headers.insert(CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(call.correlation_id.as_str()) {
            headers.insert(CORRELATION_ID, value);
        }
        self.cors.apply(headers);
        response
    }
}

impl std::fmt::Debug for ResponseShaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseShaper")
            .field("cors", &self.cors)
            .finish_non_exhaustive()
    }
}
