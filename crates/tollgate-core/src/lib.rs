//! # Tollgate Core
//!
//! Core types and traits for the Tollgate request-handling core.
//!
//! This crate provides the foundational types shared by every other Tollgate
//! crate:
//!
//! - [`Identity`] - Verified caller identity
//! - [`ExecutionContext`] - Per-call context handed to handlers
//! - [`ValidationPolicy`] - Correlation, version and auth requirements
//! - [`GateError`] - The failure taxonomy translated by the response shaper
//! - [`Handler`], [`UploadHandler`], [`StreamHandler`] - Handler capabilities
//! - [`IdentityVerifier`] - Pluggable credential verification
//! - [`ConfigurationHandle`] and [`LoggerHandle`] - Collaborator capabilities

#![doc(html_root_url = "https://docs.rs/tollgate-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod context;
mod error;
mod handler;
pub mod headers;
mod identity;
mod logger;
mod policy;
mod upload;
mod verifier;

pub use config::ConfigurationHandle;
pub use context::{CorrelationId, ExecutionContext};
pub use error::{ErrorBody, GateError, GateResult, APP_VERSION_NOT_COMPATIBLE, GENERIC_FAILURE_MESSAGE};
pub use handler::{ApiRequest, ByteStream, Handler, StreamHandler, UploadHandler};
pub use identity::Identity;
pub use logger::{LogLevel, LoggerHandle, NoopLogger};
pub use policy::{ClientVersion, ValidationPolicy};
pub use upload::StagedUpload;
pub use verifier::{AuthFailure, IdentityVerifier};
