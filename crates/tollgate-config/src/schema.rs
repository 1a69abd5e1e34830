//! Configuration sections.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tollgate_auth::{DEFAULT_ISSUERS, DEFAULT_JWKS_URL, GOOGLE_PROVIDER_TAG};
use tollgate_core::ValidationPolicy;
use tollgate_middleware::cors::{DEFAULT_ALLOW_HEADERS, DEFAULT_ALLOW_METHODS};
use tollgate_middleware::CorsPolicy;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default deadline for standard routes in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default deadline for upload routes in milliseconds.
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u64 = 600_000;

/// Default cap on buffered JSON and stream request bodies.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Service identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSection {
    /// Service name, reported by the liveness route and stamped on logs.
    pub name: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "tollgate-service".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address.
    pub http_addr: String,
    /// Deadline for standard routes.
    pub request_timeout_ms: u64,
    /// Deadline for upload routes.
    pub upload_timeout_ms: u64,
    /// How long in-flight connections may drain on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Largest request body a non-upload route will buffer.
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            upload_timeout_ms: DEFAULT_UPLOAD_TIMEOUT_MS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerSection {
    /// Deadline for standard routes.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Deadline for upload routes.
    #[must_use]
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    /// Graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Built-in token provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuiltinProviderSection {
    /// Provider tag.
    pub tag: String,
    /// Trusted issuers.
    pub issuers: Vec<String>,
    /// JWKS endpoint the signing keys are fetched from.
    pub jwks_url: String,
    /// Accepted signing algorithms.
    pub algorithms: Vec<Algorithm>,
    /// How long fetched keys are cached.
    pub jwks_ttl_secs: u64,
}

impl Default for BuiltinProviderSection {
    fn default() -> Self {
        Self {
            tag: GOOGLE_PROVIDER_TAG.to_string(),
            issuers: DEFAULT_ISSUERS.iter().map(ToString::to_string).collect(),
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            algorithms: vec![Algorithm::RS256],
            jwks_ttl_secs: 3600,
        }
    }
}

/// Remote auth endpoint used as the custom provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomProviderSection {
    /// Provider tag credentials must carry to be routed here.
    pub tag: String,
    /// Base URL of the auth service; `/verify` is appended.
    pub endpoint: String,
    /// Request timeout.
    #[serde(default = "default_custom_timeout_ms")]
    pub timeout_ms: u64,
}

const fn default_custom_timeout_ms() -> u64 {
    5_000
}

impl CustomProviderSection {
    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Authentication and validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    /// Whether a verified bearer credential is required.
    pub require_auth: bool,
    /// Whether `x-correlation-id` is required.
    pub require_correlation_id: bool,
    /// Minimum accepted `x-app-version`.
    pub min_client_version: Option<String>,
    /// Audience expected in built-in provider tokens.
    pub expected_audience: String,
    /// Built-in provider.
    pub builtin: BuiltinProviderSection,
    /// Optional custom provider.
    pub custom: Option<CustomProviderSection>,
}

impl Default for AuthSection {
    fn default() -> Self {
        let policy = ValidationPolicy::default();
        Self {
            require_auth: policy.require_auth,
            require_correlation_id: policy.require_correlation_id,
            min_client_version: policy.min_client_version,
            expected_audience: String::new(),
            builtin: BuiltinProviderSection::default(),
            custom: None,
        }
    }
}

impl AuthSection {
    /// The process-wide validation policy.
    #[must_use]
    pub fn policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            require_auth: self.require_auth,
            require_correlation_id: self.require_correlation_id,
            min_client_version: self.min_client_version.clone(),
        }
    }
}

/// CORS header values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsSection {
    /// `Access-Control-Allow-Origin`
    pub allow_origin: String,
    /// `Access-Control-Allow-Headers`
    pub allow_headers: String,
    /// `Access-Control-Allow-Methods`
    pub allow_methods: String,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_headers: DEFAULT_ALLOW_HEADERS.to_string(),
            allow_methods: DEFAULT_ALLOW_METHODS.to_string(),
        }
    }
}

impl CorsSection {
    /// Builds the CORS policy.
    #[must_use]
    pub fn policy(&self) -> CorsPolicy {
        CorsPolicy::from_values(&self.allow_origin, &self.allow_headers, &self.allow_methods)
    }
}
