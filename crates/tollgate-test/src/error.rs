//! Test harness errors.

use thiserror::Error;

/// Errors raised by the harness itself, never by the code under test.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be assembled.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// The response body could not be read.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A token could not be signed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The gateway could not be assembled or configured.
    #[error("gateway error: {0}")]
    Gateway(#[from] tollgate_server::ServerError),

    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] tollgate_config::ConfigError),
}
