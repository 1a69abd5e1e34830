//! Request validation.
//!
//! Each call walks a fixed sequence of stages. A stage either hands the call
//! to the next stage or fails it with a [`GateError`], which short-circuits to
//! the response shaper:
//!
//! ```text
//! Received ─▶ CheckCorrelation ─▶ CheckVersion ─▶ CheckAuth ─▶ Validated
//!     │               │                 │              │
//!     └── 400 ────────┴──── 412 ────────┴──── 401 ─────┘
//! ```
//!
//! Credentials are inspected without verification to pick a verifier from
//! the [`ProviderRegistry`]; the chosen verifier then decides. The raw
//! credential never reaches a log, only its redacted prefix.

use http::HeaderMap;
use std::fmt;
use std::sync::Arc;
use tollgate_auth::{redact, strip_bearer, ProviderRegistry, UnverifiedClaims};
use tollgate_core::headers::{APP_VERSION, AUTHORIZATION, CORRELATION_ID};
use tollgate_core::{
    AuthFailure, CorrelationId, GateError, Identity, LogLevel, LoggerHandle, ValidationPolicy,
};
use tollgate_telemetry::metrics::record_auth_failure;

/// The stages of request validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    /// The call has arrived; nothing has been checked.
    Received,
    /// The correlation id requirement has been met.
    CheckCorrelation,
    /// The client version requirement has been met.
    CheckVersion,
    /// A credential is being verified.
    CheckAuth,
    /// Every requirement has been met.
    Validated,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::CheckCorrelation => "check-correlation",
            Self::CheckVersion => "check-version",
            Self::CheckAuth => "check-auth",
            Self::Validated => "validated",
        };
        f.write_str(name)
    }
}

/// The Tollgate headers of an inbound call. Empty values count as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundHeaders<'a> {
    /// `x-correlation-id`
    pub correlation_id: Option<&'a str>,
    /// `x-app-version`
    pub client_version: Option<&'a str>,
    /// `authorization`
    pub authorization: Option<&'a str>,
}

impl<'a> InboundHeaders<'a> {
    /// Reads the Tollgate headers from a header map.
    #[must_use]
    pub fn from_headers(headers: &'a HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        Self {
            correlation_id: read(CORRELATION_ID),
            client_version: read(APP_VERSION),
            authorization: read(AUTHORIZATION),
        }
    }
}

/// The outcome of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validated {
    /// The verified caller, present only when the policy required auth.
    pub identity: Option<Identity>,
    /// The presented client version.
    pub client_version: Option<String>,
}

/// Runs the validation stages for one call.
#[derive(Clone)]
pub struct RequestValidator {
    registry: Arc<ProviderRegistry>,
    logger: Arc<dyn LoggerHandle>,
}

impl RequestValidator {
    /// Creates a validator over the provider registry.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, logger: Arc<dyn LoggerHandle>) -> Self {
        Self { registry, logger }
    }

    /// The provider registry consulted for credentials.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Validates the headers of a call against `policy`.
    ///
    /// `correlation_id` tags the log entries written while validating; it is
    /// the presented id or the one generated for this call.
    pub async fn validate(
        &self,
        headers: &HeaderMap,
        policy: &ValidationPolicy,
        correlation_id: &CorrelationId,
    ) -> Result<Validated, GateError> {
        let inbound = InboundHeaders::from_headers(headers);
        let mut identity = None;
        let mut stage = ValidationStage::Received;

        loop {
            tracing::trace!(correlation_id = %correlation_id, %stage, "validation stage");
            stage = match stage {
                ValidationStage::Received => {
                    if policy.require_correlation_id && inbound.correlation_id.is_none() {
                        return Err(GateError::missing_correlation_id());
                    }
                    ValidationStage::CheckCorrelation
                }
                ValidationStage::CheckCorrelation => {
                    if let Some(version) = inbound.client_version {
                        if policy.rejects_version(version) {
                            self.logger.log(
                                correlation_id.as_str(),
                                &format!(
                                    "Client version {version} is below the minimum {}",
                                    policy.min_client_version.as_deref().unwrap_or_default()
                                ),
                                LogLevel::Warn,
                            );
                            return Err(GateError::incompatible_client_version());
                        }
                    }
                    ValidationStage::CheckVersion
                }
                ValidationStage::CheckVersion => {
                    if policy.require_auth {
                        ValidationStage::CheckAuth
                    } else {
                        ValidationStage::Validated
                    }
                }
                ValidationStage::CheckAuth => {
                    let header = inbound
                        .authorization
                        .ok_or_else(GateError::missing_credential)?;
                    identity = Some(self.authenticate(header, correlation_id).await?);
                    ValidationStage::Validated
                }
                ValidationStage::Validated => {
                    return Ok(Validated {
                        identity,
                        client_version: inbound.client_version.map(ToString::to_string),
                    });
                }
            };
        }
    }

    async fn authenticate(
        &self,
        header: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Identity, GateError> {
        let credential = strip_bearer(header).unwrap_or(header);

        match self.verify(credential).await {
            Ok(identity) => {
                tracing::debug!(
                    correlation_id = %correlation_id,
                    provider = identity.provider_tag(),
                    "credential verified"
                );
                Ok(identity)
            }
            Err(failure) => {
                let redacted = redact(credential);
                self.logger.log(
                    correlation_id.as_str(),
                    &format!("Authorization token [{redacted}] rejected: {failure}"),
                    LogLevel::Warn,
                );
                record_auth_failure(failure.reason());
                Err(GateError::invalid_credential(&redacted))
            }
        }
    }

    async fn verify(&self, credential: &str) -> Result<Identity, AuthFailure> {
        let claims = UnverifiedClaims::inspect(credential)?;
        let verifier = self.registry.resolve_claims(&claims)?;
        verifier.verify(credential).await
    }
}

impl fmt::Debug for RequestValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestValidator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
