//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be loaded or accepted.
///
/// Every variant names the file, field or variable at fault so that a
/// failed startup can be fixed from the log line alone.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The named file does not exist.
    #[error("no configuration at {path}")]
    NotFound {
        /// Where the file was expected.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read configuration at {path}")]
    Unreadable {
        /// The file.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is neither TOML nor JSON.
    #[error("unsupported configuration format '{0}' (expected toml or json)")]
    UnsupportedFormat(String),

    /// The document does not match the schema.
    #[error("malformed {format} configuration: {message}")]
    Parse {
        /// `toml` or `json`.
        format: &'static str,
        /// Parser message, including the offending key when known.
        message: String,
    },

    /// A required field is empty or absent.
    #[error("{field} is required")]
    Missing {
        /// Dotted field path.
        field: String,
    },

    /// A field holds a value the gateway cannot use.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `TOLLGATE__*` override could not be applied.
    #[error("environment override {var}: {reason}")]
    Env {
        /// The variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A verifier described by the configuration could not be built.
    #[error("verifier setup failed: {0}")]
    Verifier(String),
}

impl ConfigError {
    /// A missing file.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// An unreadable file.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// A format other than TOML or JSON.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// A required field left empty.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }

    /// A field with an unusable value.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// A bad environment override.
    pub fn env(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// The field path at fault, if the error is about one field.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Missing { field } | Self::Invalid { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse {
            format: "toml",
            message: err.message().to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            format: "json",
            message: err.to_string(),
        }
    }
}
