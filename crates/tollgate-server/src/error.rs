//! Server errors.

use crate::router::RouteError;
use thiserror::Error;
use tollgate_auth::RegistryError;
use tollgate_config::ConfigError;

/// Errors raised while assembling or running a gateway.
///
/// Per-call failures never surface here; they are shaped into responses.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The provider registry could not be built.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The route table could not be built.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Configuration was installed twice.
    #[error("gateway configuration is already installed")]
    AlreadyInitialized,
}

impl ServerError {
    /// Creates a bind error.
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}
