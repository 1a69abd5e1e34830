//! The root configuration type.

use crate::error::ConfigError;
use crate::schema::{AuthSection, CorsSection, ServerSection, ServiceSection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use tollgate_extract::UploadConfig;
use tollgate_telemetry::{LogConfig, MetricsConfig};

/// Complete Tollgate service configuration.
///
/// Every section falls back to its defaults, so a file only needs the keys
/// it changes. Unknown keys are rejected.
///
/// The free-form `[app]` table carries service-specific settings that
/// handlers read through [`app_setting`](Self::app_setting).
///
/// # Example
///
/// ```
/// use tollgate_config::TollgateConfig;
///
/// let config = TollgateConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.auth.require_auth);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TollgateConfig {
    /// Service identity.
    pub service: ServiceSection,
    /// HTTP server settings.
    pub server: ServerSection,
    /// Authentication and validation.
    pub auth: AuthSection,
    /// Upload staging.
    pub upload: UploadConfig,
    /// Logging.
    pub logging: LogConfig,
    /// Prometheus exporter.
    pub metrics: MetricsConfig,
    /// CORS headers.
    pub cors: CorsSection,
    /// Service-specific settings.
    pub app: Map<String, Value>,
}

impl TollgateConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::missing("service.name"));
        }

        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.server.upload_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "server.upload_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.auth.require_auth && self.auth.expected_audience.trim().is_empty() {
            return Err(ConfigError::missing("auth.expected_audience"));
        }
        if self
            .auth
            .min_client_version
            .as_deref()
            .is_some_and(|v| v.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "auth.min_client_version",
                "must not be empty",
            ));
        }
        if self.auth.builtin.algorithms.is_empty() {
            return Err(ConfigError::invalid(
                "auth.builtin.algorithms",
                "at least one algorithm is required",
            ));
        }
        if let Some(custom) = &self.auth.custom {
            if custom.tag.trim().is_empty() {
                return Err(ConfigError::missing("auth.custom.tag"));
            }
            if custom.tag == self.auth.builtin.tag {
                return Err(ConfigError::invalid(
                    "auth.custom.tag",
                    format!("'{}' is the built-in provider tag", custom.tag),
                ));
            }
            if !(custom.endpoint.starts_with("http://") || custom.endpoint.starts_with("https://"))
            {
                return Err(ConfigError::invalid(
                    "auth.custom.endpoint",
                    format!("expected an http(s) URL, got '{}'", custom.endpoint),
                ));
            }
        }

        if self.upload.max_fields == 0 {
            return Err(ConfigError::invalid(
                "upload.max_fields",
                "must be greater than zero",
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        Ok(())
    }

    /// Local development preset: loopback address, pretty debug logs, no
    /// authentication.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.logging = LogConfig::development();
        config.auth.require_auth = false;
        config
    }

    /// Production preset: the defaults with JSON logs.
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LogConfig::production(),
            ..Self::default()
        }
    }

    /// Reads a value from the `[app]` table.
    ///
    /// Returns `None` if the key is absent or does not deserialize as `T`.
    #[must_use]
    pub fn app_setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.app
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> TollgateConfig {
        let mut config = TollgateConfig::default();
        config.auth.expected_audience = "client-id".to_string();
        config
    }

    #[test]
    fn test_defaults_need_an_audience() {
        assert!(matches!(
            TollgateConfig::default().validate(),
            Err(ConfigError::Missing { .. })
        ));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_development_preset_is_valid_without_audience() {
        let config = TollgateConfig::development();
        assert!(config.validate().is_ok());
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_bad_address() {
        let mut config = valid();
        config.server.http_addr = "localhost".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "server.http_addr"
        ));
    }

    #[test]
    fn test_custom_tag_cannot_shadow_builtin() {
        let config: TollgateConfig = toml::from_str(
            r#"
            [auth]
            expected_audience = "client-id"

            [auth.custom]
            tag = "google"
            endpoint = "http://auth:8080"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let parsed: Result<TollgateConfig, _> = toml::from_str("[server]\nhttp_port = 8080");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_app_settings() {
        let config: TollgateConfig = toml::from_str(
            r#"
            [app]
            bucket = "kud-uploads"
            retries = 3
            "#,
        )
        .unwrap();
        assert_eq!(
            config.app_setting::<String>("bucket").as_deref(),
            Some("kud-uploads")
        );
        assert_eq!(config.app_setting::<u32>("retries"), Some(3));
        assert_eq!(config.app_setting::<u32>("bucket"), None);
    }
}
