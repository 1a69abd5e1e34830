//! Header names consumed and emitted by Tollgate.

/// Bearer credential header.
pub const AUTHORIZATION: &str = "authorization";

/// Correlation id propagated across service calls.
pub const CORRELATION_ID: &str = "x-correlation-id";

/// Client application version.
pub const APP_VERSION: &str = "x-app-version";

/// Scheme prefix stripped from the authorization header.
pub const BEARER_PREFIX: &str = "Bearer ";
