//! Execution context types.
//!
//! The [`ExecutionContext`] is built once per inbound call, after validation
//! succeeds, and is handed to the handler by reference.

use crate::config::ConfigurationHandle;
use crate::logger::{LogLevel, LoggerHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// An opaque correlation id propagated across service calls.
///
/// Ids presented by the caller are kept verbatim. Generated ids are UUID v7,
/// which keeps them time-ordered in log storage.
///
/// # Example
///
/// ```
/// use tollgate_core::CorrelationId;
///
/// let presented = CorrelationId::new("abc-123");
/// assert_eq!(presented.as_str(), "abc-123");
///
/// let generated = CorrelationId::generate();
/// assert_eq!(generated.as_str().len(), 36);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wraps a caller-supplied correlation id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh correlation id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

/// Per-call context handed to handlers.
///
/// Not `Clone`: a context belongs to exactly one call.
pub struct ExecutionContext {
    correlation_id: CorrelationId,
    client_version: Option<String>,
    service_name: Arc<str>,
    config: Arc<dyn ConfigurationHandle>,
    logger: Arc<dyn LoggerHandle>,
    started_at: Instant,
}

impl ExecutionContext {
    /// Builds the context for one call.
    ///
    /// An absent or empty correlation id is replaced with a generated one.
    #[must_use]
    pub fn build(
        correlation_id: Option<&str>,
        client_version: Option<&str>,
        service_name: Arc<str>,
        config: Arc<dyn ConfigurationHandle>,
        logger: Arc<dyn LoggerHandle>,
    ) -> Self {
        let correlation_id = correlation_id
            .filter(|id| !id.is_empty())
            .map_or_else(CorrelationId::generate, CorrelationId::new);

        Self {
            correlation_id,
            client_version: client_version.map(ToString::to_string),
            service_name,
            config,
            logger,
            started_at: Instant::now(),
        }
    }

    /// Returns the correlation id.
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Returns the client version header, if presented.
    #[must_use]
    pub fn client_version(&self) -> Option<&str> {
        self.client_version.as_deref()
    }

    /// Returns the service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the configuration handle.
    #[must_use]
    pub fn config(&self) -> &Arc<dyn ConfigurationHandle> {
        &self.config
    }

    /// Downcasts the configuration handle to its concrete type.
    #[must_use]
    pub fn config_as<T: 'static>(&self) -> Option<&T> {
        self.config.as_any().downcast_ref::<T>()
    }

    /// Returns the logger.
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn LoggerHandle> {
        &self.logger
    }

    /// Logs a message tagged with this call's correlation id.
    pub fn log(&self, message: &str, level: LogLevel) {
        self.logger.log(self.correlation_id.as_str(), message, level);
    }

    /// Returns the time elapsed since the context was built.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("correlation_id", &self.correlation_id)
            .field("client_version", &self.client_version)
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NoopLogger;
    use crate::policy::ValidationPolicy;
    use crate::verifier::IdentityVerifier;
    use std::any::Any;

    struct FixedConfig;

    impl ConfigurationHandle for FixedConfig {
        fn auth_policy(&self) -> ValidationPolicy {
            ValidationPolicy::default()
        }

        fn expected_audience(&self) -> &str {
            "aud"
        }

        fn custom_verifier(&self) -> Option<Arc<dyn IdentityVerifier>> {
            None
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn build(cid: Option<&str>) -> ExecutionContext {
        ExecutionContext::build(
            cid,
            Some("1.2.0"),
            Arc::from("games"),
            Arc::new(FixedConfig),
            Arc::new(NoopLogger),
        )
    }

    #[test]
    fn test_presented_correlation_id_is_kept() {
        let ctx = build(Some("cid-42"));
        assert_eq!(ctx.correlation_id().as_str(), "cid-42");
        assert_eq!(ctx.client_version(), Some("1.2.0"));
        assert_eq!(ctx.service_name(), "games");
    }

    #[test]
    fn test_missing_correlation_id_is_generated() {
        let first = build(None);
        let second = build(Some(""));
        assert!(Uuid::parse_str(first.correlation_id().as_str()).is_ok());
        assert_ne!(first.correlation_id(), second.correlation_id());
    }

    #[test]
    fn test_config_downcast() {
        let ctx = build(None);
        assert!(ctx.config_as::<FixedConfig>().is_some());
        assert!(ctx.config_as::<String>().is_none());
        assert_eq!(ctx.config().expected_audience(), "aud");
    }
}
