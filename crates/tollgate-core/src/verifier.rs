//! Credential verification capability.

use crate::identity::Identity;
use async_trait::async_trait;
use thiserror::Error;

/// Why a bearer credential was not accepted.
///
/// Every variant surfaces to the client as `401 Unauthorized`; the variant
/// itself is only logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// The credential could not be decoded.
    #[error("malformed credential: {0}")]
    Malformed(String),

    /// No registered verifier handles the credential's provider tag.
    #[error("no verifier for provider {0:?}")]
    NoVerifier(Option<String>),

    /// The signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// The credential has expired.
    #[error("credential expired")]
    Expired,

    /// The audience does not match the expected audience.
    #[error("audience mismatch")]
    AudienceMismatch,

    /// The issuer is not trusted by the selected verifier.
    #[error("untrusted issuer")]
    UntrustedIssuer,

    /// The credential was rejected for another reason.
    #[error("credential rejected: {0}")]
    Rejected(String),

    /// The verifier could not reach its key issuer or remote endpoint.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

impl AuthFailure {
    /// Returns a short label for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::NoVerifier(_) => "no_verifier",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::AudienceMismatch => "audience_mismatch",
            Self::UntrustedIssuer => "untrusted_issuer",
            Self::Rejected(_) => "rejected",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// Verifies a bearer credential and produces an [`Identity`].
///
/// Implementations are registered with the provider registry under a
/// provider tag; the registry picks one per call from the unverified
/// `authProvider` claim.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    /// The provider tag this verifier answers for.
    fn provider_tag(&self) -> &str;

    /// Verifies the raw credential (without the `Bearer ` prefix).
    async fn verify(&self, credential: &str) -> Result<Identity, AuthFailure>;
}
