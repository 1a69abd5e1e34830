//! Configuration capability consumed by the core.

use crate::policy::ValidationPolicy;
use crate::verifier::IdentityVerifier;
use std::any::Any;
use std::sync::Arc;

/// Process-wide configuration, loaded once before serving starts.
///
/// Handlers reach service-specific settings through
/// [`as_any`](Self::as_any) and a downcast to the concrete type.
pub trait ConfigurationHandle: Send + Sync + 'static {
    /// The process-wide validation policy.
    fn auth_policy(&self) -> ValidationPolicy;

    /// The audience expected in built-in provider tokens.
    fn expected_audience(&self) -> &str;

    /// The custom verifier, if one is configured.
    fn custom_verifier(&self) -> Option<Arc<dyn IdentityVerifier>>;

    /// Access to the concrete configuration type.
    fn as_any(&self) -> &dyn Any;
}
