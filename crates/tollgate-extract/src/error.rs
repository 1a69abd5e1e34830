//! Upload failures.

use http::StatusCode;
use thiserror::Error;
use tollgate_core::GateError;

/// Why an upload body could not be staged.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request is not `multipart/form-data` or has no boundary.
    #[error("expected a multipart/form-data body: {0}")]
    NotMultipart(String),

    /// The body could not be parsed as multipart.
    #[error("malformed multipart body: {0}")]
    Malformed(String),

    /// The file part exceeded the size limit.
    #[error("uploaded file exceeds {limit} bytes")]
    FileTooLarge {
        /// The configured limit.
        limit: u64,
    },

    /// The body has more parts than allowed.
    #[error("too many multipart fields (max {limit})")]
    TooManyFields {
        /// The configured limit.
        limit: usize,
    },

    /// A text field exceeded the size limit.
    #[error("field '{name}' exceeds {limit} bytes")]
    FieldTooLarge {
        /// Name of the field.
        name: String,
        /// The configured limit.
        limit: usize,
    },

    /// The body carried no file part.
    #[error("No file was uploaded")]
    NoFile,

    /// Writing the staged file failed.
    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// The HTTP status this failure maps to.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotMultipart(_) | Self::Malformed(_) | Self::NoFile => StatusCode::BAD_REQUEST,
            Self::FileTooLarge { .. } | Self::TooManyFields { .. } | Self::FieldTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UploadError> for GateError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(source) => {
                GateError::unclassified_with_source("failed to stage upload", source)
            }
            UploadError::FileTooLarge { .. }
            | UploadError::TooManyFields { .. }
            | UploadError::FieldTooLarge { .. } => GateError::payload_too_large(err.to_string()),
            other => GateError::validation(other.status_code(), other.to_string()),
        }
    }
}
