//! Failure taxonomy for Tollgate.
//!
//! Every failure raised while validating a call, building its context or
//! running its handler is a [`GateError`]. The response shaper is the single
//! place that turns a `GateError` into a status code and an [`ErrorBody`].
//!
//! | Variant | Status | Body |
//! |---|---|---|
//! | `Validation` | carried (always 4xx) | `{code, message, subcode?}` |
//! | `Runtime` | carried (application-chosen) | `{code, message}` |
//! | `Unclassified` | 500 | generic, detail logged only |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`GateError`].
pub type GateResult<T> = Result<T, GateError>;

/// Message sent to clients in place of unclassified failure detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "Internal Server Error";

/// Subcode attached to client-version rejections.
pub const APP_VERSION_NOT_COMPATIBLE: &str = "app-version-not-compatible";

/// A failure raised anywhere in the request pipeline.
///
/// # Example
///
/// ```
/// use tollgate_core::GateError;
/// use http::StatusCode;
///
/// fn reserve(seats: u32) -> Result<(), GateError> {
///     if seats == 0 {
///         return Err(GateError::runtime(StatusCode::CONFLICT, "No seats left"));
///     }
///     Ok(())
/// }
///
/// assert_eq!(reserve(0).unwrap_err().status_code(), StatusCode::CONFLICT);
/// ```
#[derive(Error, Debug)]
pub enum GateError {
    /// Client-caused failure: missing or invalid input, credential or version.
    #[error("Validation failure ({status}): {message}")]
    Validation {
        /// HTTP status, always in the 4xx range.
        status: StatusCode,
        /// Human-readable message returned to the client.
        message: String,
        /// Optional machine-readable subcode.
        subcode: Option<String>,
    },

    /// Business fault declared by a handler.
    #[error("Runtime failure ({status}): {message}")]
    Runtime {
        /// HTTP status chosen by the application.
        status: StatusCode,
        /// Human-readable message returned to the client.
        message: String,
    },

    /// Anything else. Masked as 500 on the wire.
    #[error("Unclassified failure: {message}")]
    Unclassified {
        /// Server-side description. Never sent to the client.
        message: String,
        /// The underlying error, logged in full.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl GateError {
    /// Creates a validation failure.
    ///
    /// Statuses outside the 4xx range are coerced to `400 Bad Request`.
    #[must_use]
    pub fn validation(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Validation {
            status: client_status(status),
            message: message.into(),
            subcode: None,
        }
    }

    /// Creates a validation failure with a machine-readable subcode.
    #[must_use]
    pub fn validation_with_subcode(
        status: StatusCode,
        message: impl Into<String>,
        subcode: impl Into<String>,
    ) -> Self {
        Self::Validation {
            status: client_status(status),
            message: message.into(),
            subcode: Some(subcode.into()),
        }
    }

    /// Creates a `400 Bad Request` validation failure.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::validation(StatusCode::BAD_REQUEST, message)
    }

    /// The correlation id header was required but absent.
    #[must_use]
    pub fn missing_correlation_id() -> Self {
        Self::bad_request("No Correlation ID was provided")
    }

    /// The client version is below the configured minimum.
    #[must_use]
    pub fn incompatible_client_version() -> Self {
        Self::validation_with_subcode(
            StatusCode::PRECONDITION_FAILED,
            "The App Version is not compatible with this API",
            APP_VERSION_NOT_COMPATIBLE,
        )
    }

    /// No bearer credential was presented.
    #[must_use]
    pub fn missing_credential() -> Self {
        Self::validation(StatusCode::UNAUTHORIZED, "No Authorization Header provided")
    }

    /// The presented credential failed verification.
    ///
    /// `redacted` is a shortened form of the credential, never the raw value.
    #[must_use]
    pub fn invalid_credential(redacted: &str) -> Self {
        Self::validation(
            StatusCode::UNAUTHORIZED,
            format!("Invalid Authorization Token [{redacted}]"),
        )
    }

    /// No route matched the method and path.
    #[must_use]
    pub fn route_not_found(method: &http::Method, path: &str) -> Self {
        Self::validation(StatusCode::NOT_FOUND, format!("No route for {method} {path}"))
    }

    /// The request body exceeded a configured limit.
    #[must_use]
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::validation(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    /// Creates a runtime failure with an application-chosen status.
    #[must_use]
    pub fn runtime(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Runtime {
            status,
            message: message.into(),
        }
    }

    /// The call exceeded its deadline.
    #[must_use]
    pub fn timeout() -> Self {
        Self::runtime(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
    }

    /// Creates an unclassified failure.
    #[must_use]
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::Unclassified {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unclassified failure wrapping its cause.
    pub fn unclassified_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Unclassified {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the HTTP status code for this failure.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { status, .. } | Self::Runtime { status, .. } => *status,
            Self::Unclassified { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Runtime { .. } => "runtime",
            Self::Unclassified { .. } => "unclassified",
        }
    }

    /// Returns the subcode, if any.
    #[must_use]
    pub fn subcode(&self) -> Option<&str> {
        match self {
            Self::Validation { subcode, .. } => subcode.as_deref(),
            _ => None,
        }
    }

    /// Converts this failure to the body sent to the client.
    ///
    /// Unclassified failures are masked with [`GENERIC_FAILURE_MESSAGE`].
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            Self::Validation { message, .. } | Self::Runtime { message, .. } => message.clone(),
            Self::Unclassified { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
        };
        ErrorBody {
            code: self.status_code().as_u16(),
            message,
            subcode: self.subcode().map(ToString::to_string),
        }
    }

    /// Returns the full server-side description, including the source chain.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Unclassified {
                message,
                source: Some(source),
            } => format!("{message}: {source:#}"),
            other => other.to_string(),
        }
    }
}

fn client_status(status: StatusCode) -> StatusCode {
    if status.is_client_error() {
        status
    } else {
        StatusCode::BAD_REQUEST
    }
}

impl From<anyhow::Error> for GateError {
    fn from(err: anyhow::Error) -> Self {
        Self::Unclassified {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for GateError {
    fn from(err: std::io::Error) -> Self {
        Self::unclassified_with_source("I/O failure", err)
    }
}

/// Wire representation of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub code: u16,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable subcode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcode: Option<String>,
}
