//! Built-in signed-token verifier.

use crate::keys::KeySource;
use crate::token::UnverifiedClaims;
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use tollgate_core::{AuthFailure, Identity, IdentityVerifier};

/// Provider tag of the built-in verifier.
pub const GOOGLE_PROVIDER_TAG: &str = "google";

/// Issuers trusted by the built-in verifier unless configured otherwise.
pub const DEFAULT_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

#[derive(Debug, Deserialize)]
struct VerifiedClaims {
    sub: String,
    email: Option<String>,
}

/// Verifies issuer-signed JWTs against a [`KeySource`] and an expected
/// audience.
///
/// # Example
///
/// ```
/// use jsonwebtoken::{Algorithm, DecodingKey};
/// use tollgate_auth::{BuiltinVerifier, StaticKeySource};
///
/// let verifier = BuiltinVerifier::new(
///     "my-client-id.apps.example.com",
///     StaticKeySource::single(DecodingKey::from_secret(b"secret")),
/// )
/// .with_algorithms([Algorithm::HS256]);
/// ```
pub struct BuiltinVerifier {
    tag: String,
    audience: String,
    issuers: Vec<String>,
    algorithms: Vec<Algorithm>,
    leeway_secs: u64,
    keys: Arc<dyn KeySource>,
}

impl BuiltinVerifier {
    /// Creates a verifier for the given audience.
    ///
    /// Defaults: tag `google`, the Google issuers, `RS256` only, 60 seconds
    /// of clock leeway.
    #[must_use]
    pub fn new(audience: impl Into<String>, keys: impl KeySource) -> Self {
        Self {
            tag: GOOGLE_PROVIDER_TAG.to_string(),
            audience: audience.into(),
            issuers: DEFAULT_ISSUERS.iter().map(ToString::to_string).collect(),
            algorithms: vec![Algorithm::RS256],
            leeway_secs: 60,
            keys: Arc::new(keys),
        }
    }

    /// Overrides the provider tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Replaces the trusted issuers.
    #[must_use]
    pub fn with_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issuers = issuers.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the accepted signing algorithms.
    #[must_use]
    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms.into_iter().collect();
        self
    }

    /// Sets the clock leeway applied to `exp` and `nbf`.
    #[must_use]
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_secs = seconds;
        self
    }

    /// The trusted issuers. The registry routes untagged tokens from these
    /// issuers to this verifier.
    #[must_use]
    pub fn issuers(&self) -> &[String] {
        &self.issuers
    }

    /// The expected audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(self.issuers.as_slice());
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway_secs;
        validation
    }

    fn log_audience_mismatch(&self, credential: &str) {
        let Ok(claims) = UnverifiedClaims::inspect(credential) else {
            return;
        };
        match claims.aud {
            Some(aud) if aud.contains(&self.audience) => {}
            Some(aud) => tracing::error!(
                payload_audience = %aud,
                expected_audience = %self.audience,
                "token audience does not match expected audience"
            ),
            None => tracing::error!(
                expected_audience = %self.audience,
                "token carries no audience"
            ),
        }
    }
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> AuthFailure {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthFailure::Expired,
        ErrorKind::InvalidAudience => AuthFailure::AudienceMismatch,
        ErrorKind::InvalidIssuer => AuthFailure::UntrustedIssuer,
        ErrorKind::InvalidSignature => AuthFailure::InvalidSignature,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthFailure::Malformed(err.to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthFailure::Rejected(format!("missing required claim {claim}"))
        }
        ErrorKind::ImmatureSignature => AuthFailure::Rejected("token not yet valid".to_string()),
        _ => AuthFailure::Rejected(err.to_string()),
    }
}

#[async_trait]
impl IdentityVerifier for BuiltinVerifier {
    fn provider_tag(&self) -> &str {
        &self.tag
    }

    async fn verify(&self, credential: &str) -> Result<Identity, AuthFailure> {
        let header = jsonwebtoken::decode_header(credential)
            .map_err(|e| AuthFailure::Malformed(e.to_string()))?;

        if !self.algorithms.contains(&header.alg) {
            return Err(AuthFailure::Rejected(format!(
                "signing algorithm {:?} is not accepted",
                header.alg
            )));
        }

        self.log_audience_mismatch(credential);

        let key = self.keys.decoding_key(header.kid.as_deref()).await?;
        let data = jsonwebtoken::decode::<VerifiedClaims>(
            credential,
            &key,
            &self.validation(header.alg),
        )
        .map_err(|e| map_jwt_error(&e))?;

        let claims = data.claims;
        Ok(match claims.email {
            Some(email) => Identity::new(claims.sub, email, &self.tag),
            None => Identity::without_email(claims.sub, &self.tag),
        })
    }
}

impl std::fmt::Debug for BuiltinVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinVerifier")
            .field("tag", &self.tag)
            .field("audience", &self.audience)
            .field("issuers", &self.issuers)
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}
