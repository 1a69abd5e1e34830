//! Signed test credentials.

use crate::error::TestError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tollgate_auth::{BuiltinVerifier, StaticKeySource, DEFAULT_ISSUERS};
use tollgate_core::IdentityVerifier;

/// Audience used when none is set.
pub const TEST_AUDIENCE: &str = "tollgate-test-audience";

const LIFETIME_SECS: u64 = 3600;

/// Mints HS256 tokens and the built-in verifier that accepts them.
///
/// Tokens carry the issuer, audience, subject and email the built-in
/// verifier checks. Without a provider tag they are routed to the built-in
/// verifier by issuer.
#[derive(Debug, Clone)]
pub struct TokenMinter {
    secret: Vec<u8>,
    audience: String,
    issuer: String,
    provider_tag: Option<String>,
}

impl TokenMinter {
    /// A minter signing with `secret`.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            audience: TEST_AUDIENCE.to_string(),
            issuer: DEFAULT_ISSUERS[0].to_string(),
            provider_tag: None,
        }
    }

    /// Sets the `aud` claim.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Sets the `iss` claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the `authProvider` claim.
    #[must_use]
    pub fn with_provider_tag(mut self, tag: impl Into<String>) -> Self {
        self.provider_tag = Some(tag.into());
        self
    }

    /// The `aud` claim minted tokens carry.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// A token valid for an hour.
    pub fn mint(&self, subject: &str, email: &str) -> Result<String, TestError> {
        let now = now_secs();
        self.sign(&self.claims(subject, email, now, now + LIFETIME_SECS))
    }

    /// A token that expired an hour ago.
    pub fn mint_expired(&self, subject: &str, email: &str) -> Result<String, TestError> {
        let now = now_secs();
        let issued = now.saturating_sub(2 * LIFETIME_SECS);
        self.sign(&self.claims(subject, email, issued, issued + LIFETIME_SECS))
    }

    /// Signs arbitrary claims.
    pub fn sign(&self, claims: &Value) -> Result<String, TestError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )?)
    }

    /// A built-in verifier that trusts this minter's secret and issuer.
    #[must_use]
    pub fn builtin_verifier(&self) -> Arc<dyn IdentityVerifier> {
        let keys = StaticKeySource::single(DecodingKey::from_secret(&self.secret));
        Arc::new(
            BuiltinVerifier::new(&self.audience, keys)
                .with_issuers([self.issuer.clone()])
                .with_algorithms([Algorithm::HS256]),
        )
    }

    fn claims(&self, subject: &str, email: &str, iat: u64, exp: u64) -> Value {
        let mut claims = json!({
            "sub": subject,
            "email": email,
            "aud": self.audience,
            "iss": self.issuer,
            "iat": iat,
            "exp": exp,
        });
        if let Some(tag) = &self.provider_tag {
            claims["authProvider"] = json!(tag);
        }
        claims
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
