//! The configuration handle handed to handlers.

use crate::config::TollgateConfig;
use crate::error::ConfigError;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tollgate_auth::{BuiltinVerifier, JwksKeySource, RemoteVerifier};
use tollgate_core::{ConfigurationHandle, IdentityVerifier, ValidationPolicy};

/// A validated [`TollgateConfig`] plus the collaborators built from it.
///
/// Handlers reach it through `ExecutionContext::config_as::<ServiceConfiguration>()`.
#[derive(Clone)]
pub struct ServiceConfiguration {
    config: TollgateConfig,
    custom: Option<Arc<dyn IdentityVerifier>>,
}

impl ServiceConfiguration {
    /// Validates `config` and builds the remote verifier if `[auth.custom]`
    /// is present.
    pub fn new(config: TollgateConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let custom = match &config.auth.custom {
            Some(section) => {
                let verifier =
                    RemoteVerifier::new(&section.tag, &section.endpoint, section.timeout())
                        .map_err(|e| {
                            ConfigError::Verifier(format!(
                                "cannot build remote verifier for '{}': {e}",
                                section.tag
                            ))
                        })?;
                tracing::info!(
                    tag = %section.tag,
                    url = verifier.verify_url(),
                    "custom verifier configured"
                );
                Some(Arc::new(verifier) as Arc<dyn IdentityVerifier>)
            }
            None => None,
        };

        Ok(Self { config, custom })
    }

    /// Replaces the custom verifier.
    #[must_use]
    pub fn with_custom_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.custom = Some(verifier);
        self
    }

    /// The underlying configuration.
    #[must_use]
    pub fn settings(&self) -> &TollgateConfig {
        &self.config
    }

    /// The service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.config.service.name
    }

    /// Reads a value from the `[app]` table.
    #[must_use]
    pub fn app_setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.app_setting(key)
    }

    /// Builds the built-in verifier described by `[auth.builtin]`, with keys
    /// fetched from its JWKS endpoint.
    #[must_use]
    pub fn builtin_verifier(&self) -> BuiltinVerifier {
        let section = &self.config.auth.builtin;
        let keys = JwksKeySource::new(&section.jwks_url)
            .with_ttl(Duration::from_secs(section.jwks_ttl_secs));
        BuiltinVerifier::new(self.expected_audience(), keys)
            .with_tag(&section.tag)
            .with_issuers(section.issuers.iter().cloned())
            .with_algorithms(section.algorithms.iter().copied())
    }
}

impl ConfigurationHandle for ServiceConfiguration {
    fn auth_policy(&self) -> ValidationPolicy {
        self.config.auth.policy()
    }

    fn expected_audience(&self) -> &str {
        &self.config.auth.expected_audience
    }

    fn custom_verifier(&self) -> Option<Arc<dyn IdentityVerifier>> {
        self.custom.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ServiceConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfiguration")
            .field("config", &self.config)
            .field("custom", &self.custom.as_ref().map(|c| c.provider_tag()))
            .finish()
    }
}
