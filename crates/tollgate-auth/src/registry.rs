//! Provider registry.
//!
//! Resolution order for a credential:
//!
//! 1. the custom verifier, when its tag equals the presented provider tag
//! 2. the built-in verifier, when the tag equals its tag, or the tag is
//!    absent and the unverified issuer is one of its well-known issuers
//! 3. otherwise [`AuthFailure::NoVerifier`]

use crate::token::UnverifiedClaims;
use std::sync::Arc;
use thiserror::Error;
use tollgate_core::{AuthFailure, IdentityVerifier};

/// Errors raised while assembling the registry at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two verifiers claim the same provider tag.
    #[error("provider tag '{0}' is registered twice")]
    DuplicateProvider(String),

    /// A second custom verifier was registered.
    #[error("a custom verifier ('{existing}') is already registered; refusing '{rejected}'")]
    CustomAlreadyRegistered {
        /// Tag of the verifier already registered.
        existing: String,
        /// Tag of the verifier that was refused.
        rejected: String,
    },
}

/// Maps provider tags to verifiers. Built once at startup, read-only after.
#[derive(Clone)]
pub struct ProviderRegistry {
    builtin: Arc<dyn IdentityVerifier>,
    well_known_issuers: Vec<String>,
    custom: Option<Arc<dyn IdentityVerifier>>,
}

impl ProviderRegistry {
    /// Starts a registry around the built-in verifier.
    #[must_use]
    pub fn builder(builtin: Arc<dyn IdentityVerifier>) -> ProviderRegistryBuilder {
        ProviderRegistryBuilder {
            builtin,
            well_known_issuers: Vec::new(),
            custom: None,
        }
    }

    /// Picks the verifier for the given tag and unverified issuer.
    pub fn resolve(
        &self,
        provider_tag: Option<&str>,
        issuer: Option<&str>,
    ) -> Result<&Arc<dyn IdentityVerifier>, AuthFailure> {
        if let (Some(custom), Some(tag)) = (&self.custom, provider_tag) {
            if custom.provider_tag() == tag {
                return Ok(custom);
            }
        }

        let builtin_matches = match provider_tag {
            Some(tag) => tag == self.builtin.provider_tag(),
            None => issuer.is_some_and(|iss| self.well_known_issuers.iter().any(|w| w == iss)),
        };
        if builtin_matches {
            return Ok(&self.builtin);
        }

        Err(AuthFailure::NoVerifier(provider_tag.map(ToString::to_string)))
    }

    /// Picks the verifier for a credential's unverified claims.
    pub fn resolve_claims(
        &self,
        claims: &UnverifiedClaims,
    ) -> Result<&Arc<dyn IdentityVerifier>, AuthFailure> {
        self.resolve(claims.provider_tag.as_deref(), claims.iss.as_deref())
    }

    /// Tag of the built-in verifier.
    #[must_use]
    pub fn builtin_tag(&self) -> &str {
        self.builtin.provider_tag()
    }

    /// Tag of the custom verifier, if one is registered.
    #[must_use]
    pub fn custom_tag(&self) -> Option<&str> {
        self.custom.as_ref().map(|c| c.provider_tag())
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("builtin", &self.builtin_tag())
            .field("well_known_issuers", &self.well_known_issuers)
            .field("custom", &self.custom_tag())
            .finish()
    }
}

/// Builder for [`ProviderRegistry`].
pub struct ProviderRegistryBuilder {
    builtin: Arc<dyn IdentityVerifier>,
    well_known_issuers: Vec<String>,
    custom: Option<Arc<dyn IdentityVerifier>>,
}

impl ProviderRegistryBuilder {
    /// Issuers whose untagged tokens go to the built-in verifier.
    #[must_use]
    pub fn well_known_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.well_known_issuers = issuers.into_iter().map(Into::into).collect();
        self
    }

    /// Registers the custom verifier.
    pub fn custom(mut self, verifier: Arc<dyn IdentityVerifier>) -> Result<Self, RegistryError> {
        if let Some(existing) = &self.custom {
            return Err(RegistryError::CustomAlreadyRegistered {
                existing: existing.provider_tag().to_string(),
                rejected: verifier.provider_tag().to_string(),
            });
        }
        if verifier.provider_tag() == self.builtin.provider_tag() {
            return Err(RegistryError::DuplicateProvider(
                verifier.provider_tag().to_string(),
            ));
        }
        self.custom = Some(verifier);
        Ok(self)
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            builtin: self.builtin,
            well_known_issuers: self.well_known_issuers,
            custom: self.custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tollgate_core::Identity;

    struct Tagged(&'static str);

    #[async_trait]
    impl IdentityVerifier for Tagged {
        fn provider_tag(&self) -> &str {
            self.0
        }

        async fn verify(&self, _credential: &str) -> Result<Identity, AuthFailure> {
            Ok(Identity::without_email("u", self.0))
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::builder(Arc::new(Tagged("google")))
            .well_known_issuers(["https://accounts.google.com"])
            .custom(Arc::new(Tagged("toto")))
            .unwrap()
            .build()
    }

    #[test]
    fn test_custom_tag_selects_custom() {
        let registry = registry();
        let verifier = registry.resolve(Some("toto"), None).unwrap();
        assert_eq!(verifier.provider_tag(), "toto");
    }

    #[test]
    fn test_builtin_tag_selects_builtin() {
        let registry = registry();
        let verifier = registry
            .resolve(Some("google"), Some("https://evil.example.com"))
            .unwrap();
        assert_eq!(verifier.provider_tag(), "google");
    }

    #[test]
    fn test_untagged_well_known_issuer_selects_builtin() {
        let registry = registry();
        let verifier = registry
            .resolve(None, Some("https://accounts.google.com"))
            .unwrap();
        assert_eq!(verifier.provider_tag(), "google");
    }

    #[test]
    fn test_untagged_unknown_issuer_fails() {
        let registry = registry();
        let err = registry
            .resolve(None, Some("https://other.example.com"))
            .err()
            .unwrap();
        assert_eq!(err, AuthFailure::NoVerifier(None));
    }

    #[test]
    fn test_unknown_tag_fails() {
        let registry = registry();
        let err = registry.resolve(Some("github"), None).err().unwrap();
        assert_eq!(err, AuthFailure::NoVerifier(Some("github".to_string())));
    }

    #[test]
    fn test_custom_tag_colliding_with_builtin_is_rejected() {
        let err = ProviderRegistry::builder(Arc::new(Tagged("google")))
            .custom(Arc::new(Tagged("google")))
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::DuplicateProvider("google".to_string()));
    }

    #[test]
    fn test_second_custom_is_rejected() {
        let err = ProviderRegistry::builder(Arc::new(Tagged("google")))
            .custom(Arc::new(Tagged("toto")))
            .unwrap()
            .custom(Arc::new(Tagged("acme")))
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::CustomAlreadyRegistered { .. }));
    }
}
