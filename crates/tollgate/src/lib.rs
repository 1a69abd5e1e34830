//! # Tollgate
//!
//! **Request-handling core for authenticated JSON microservices**
//!
//! Every inbound call passes through the same gate before business logic runs:
//!
//! - **Correlation** - `x-correlation-id` is required and tags every log line
//! - **Client version** - `x-app-version` is checked against a minimum
//! - **Identity** - bearer credentials are routed by provider tag to exactly
//!   one verifier, the built-in JWT verifier or a registered custom one
//! - **Uploads** - multipart bodies are staged to a temporary file that is
//!   removed once the handler is done with it
//! - **Uniform failures** - every error leaves as `{code, message, subcode?}`,
//!   with unclassified failures masked as 500
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tollgate::prelude::*;
//!
//! struct Profile;
//!
//! #[async_trait]
//! impl Handler for Profile {
//!     async fn handle(
//!         &self,
//!         _request: ApiRequest,
//!         identity: Option<Identity>,
//!         _ctx: &ExecutionContext,
//!     ) -> GateResult<serde_json::Value> {
//!         let identity = identity.ok_or_else(GateError::missing_credential)?;
//!         Ok(serde_json::json!({ "sub": identity.subject_id() }))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Gateway::builder()
//!         .route(Method::GET, "/profile", Profile)
//!         .build()?;
//!
//!     gateway.run(FileConfigSource::new("tollgate.toml")).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Router → Validator (correlation, version, identity) → [Upload staging] → Handler
//!                                                                                      ↓
//! Response ← Shaper (envelope, CORS, x-correlation-id, one log line) ←─────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/tollgate/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Core types and capability traits
pub use tollgate_core as core;

// Identity verifiers and the provider registry
pub use tollgate_auth as auth;

// Validation and response shaping
pub use tollgate_middleware as middleware;

// Upload staging
pub use tollgate_extract as extract;

// Router, dispatcher and HTTP server
pub use tollgate_server as server;

// Configuration
pub use tollgate_config as config;

// Logging and metrics
pub use tollgate_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use tollgate::prelude::*;
/// ```
pub mod prelude {
    pub use tollgate_core::{
        ApiRequest, ByteStream, CorrelationId, ExecutionContext, GateError, GateResult, Handler,
        Identity, IdentityVerifier, LogLevel, LoggerHandle, StagedUpload, StreamHandler,
        UploadHandler, ValidationPolicy,
    };

    pub use tollgate_config::{
        ConfigSource, FileConfigSource, ServiceConfiguration, StaticConfigSource, TollgateConfig,
    };

    pub use tollgate_server::{Gateway, GatewayBuilder, ShutdownSignal};

    pub use async_trait::async_trait;

    pub use http::Method;
}
