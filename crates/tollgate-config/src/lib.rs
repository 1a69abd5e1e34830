//! # Tollgate Config
//!
//! Typed, layered configuration for Tollgate services.
//!
//! - [`TollgateConfig`] - every section, with defaults and validation
//! - [`ConfigLoader`] - defaults → TOML/JSON file → `TOLLGATE__SECTION__KEY`
//!   environment overrides, with `.env` support
//! - [`ConfigSource`] - async loading, awaited by the gateway before it binds
//! - [`ServiceConfiguration`] - the [`ConfigurationHandle`] handlers see
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! name = "games"
//!
//! [server]
//! http_addr = "0.0.0.0:8080"
//! request_timeout_ms = 30000
//! upload_timeout_ms = 600000
//! max_body_bytes = 1048576
//!
//! [auth]
//! expected_audience = "1234.apps.googleusercontent.com"
//! min_client_version = "2.0.0"
//!
//! [auth.custom]
//! tag = "toto"
//! endpoint = "http://auth-service:8080"
//!
//! [upload]
//! dir = "/tmp/uploads"
//! max_file_bytes = 104857600
//!
//! [app]
//! bucket = "kud-uploads"
//! ```
//!
//! [`ConfigurationHandle`]: tollgate_core::ConfigurationHandle

#![doc(html_root_url = "https://docs.rs/tollgate-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;
mod service;
mod source;

pub use config::TollgateConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::*;
pub use service::ServiceConfiguration;
pub use source::{ConfigSource, FileConfigSource, StaticConfigSource};
