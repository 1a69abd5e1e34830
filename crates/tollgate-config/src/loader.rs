//! Layered configuration loading.

use crate::config::TollgateConfig;
use crate::error::ConfigError;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Default prefix of environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "TOLLGATE";

/// Loads a [`TollgateConfig`] in layers, later layers winning:
///
/// 1. defaults
/// 2. a TOML or JSON file, chosen by extension
/// 3. environment variables named `PREFIX__SECTION__KEY`
///
/// Keys missing from the file keep the value of the layer below.
///
/// # Example
///
/// ```no_run
/// use tollgate_config::ConfigLoader;
///
/// # fn main() -> Result<(), tollgate_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()
///     .with_optional_file("tollgate.toml")?
///     .with_env_prefix("TOLLGATE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: TollgateConfig,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = TollgateConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = TollgateConfig::production();
        self
    }

    /// Loads a configuration file.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::unreadable(path, e))?;
        self.with_string(&content, &format_of(path)?)
    }

    /// Loads a configuration file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            tracing::debug!(path = %path.as_ref().display(), "optional configuration file absent");
            Ok(self)
        }
    }

    /// Merges configuration from a string in the given format (`toml` or
    /// `json`) over the current layers.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        // Parsing into the typed config first reports unknown keys in the file's own format.
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => {
                toml::from_str::<TollgateConfig>(content)?;
                toml::from_str(content)?
            }
            "json" => {
                serde_json::from_str::<TollgateConfig>(content)?;
                serde_json::from_str(content)?
            }
            _ => return Err(ConfigError::unsupported_format(format)),
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge_layer(&mut merged, layer);
        self.config = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Enables environment overrides with the given prefix.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Reads overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Loads a `.env` file into the process environment if one exists.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        self
    }

    /// Applies environment overrides and validates.
    pub fn load(mut self) -> Result<TollgateConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars = self
                .env_vars
                .take()
                .unwrap_or_else(|| std::env::vars().collect());
            for (key, value) in vars {
                if let Some(path) = key
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix("__"))
                {
                    apply_env_var(&mut self.config, &key, path, &value)?;
                }
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> TollgateConfig {
        self.config
    }
}

fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => merge_layer(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn format_of(path: &Path) -> Result<String, ConfigError> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some(ext @ ("toml" | "json")) => Ok(ext.to_string()),
        _ => Err(ConfigError::unsupported_format(path.display().to_string())),
    }
}

fn apply_env_var(
    config: &mut TollgateConfig,
    var: &str,
    path: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let parts: Vec<&str> = path.split("__").collect();

    match parts.as_slice() {
        ["SERVICE", "NAME"] => config.service.name = value.to_string(),

        ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
        ["SERVER", "REQUEST_TIMEOUT_MS"] => config.server.request_timeout_ms = parse_num(var, value)?,
        ["SERVER", "UPLOAD_TIMEOUT_MS"] => config.server.upload_timeout_ms = parse_num(var, value)?,
        ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
            config.server.shutdown_timeout_secs = parse_num(var, value)?;
        }
        ["SERVER", "MAX_BODY_BYTES"] => config.server.max_body_bytes = parse_num(var, value)?,

        ["AUTH", "REQUIRE_AUTH"] => config.auth.require_auth = parse_bool(var, value)?,
        ["AUTH", "REQUIRE_CORRELATION_ID"] => {
            config.auth.require_correlation_id = parse_bool(var, value)?;
        }
        ["AUTH", "MIN_CLIENT_VERSION"] => {
            config.auth.min_client_version = (!value.is_empty()).then(|| value.to_string());
        }
        ["AUTH", "EXPECTED_AUDIENCE"] => config.auth.expected_audience = value.to_string(),
        ["AUTH", "BUILTIN", "JWKS_URL"] => config.auth.builtin.jwks_url = value.to_string(),
        ["AUTH", "BUILTIN", "ISSUERS"] => {
            config.auth.builtin.issuers = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        ["AUTH", "CUSTOM", "ENDPOINT"] => match config.auth.custom.as_mut() {
            Some(custom) => custom.endpoint = value.to_string(),
            None => {
                return Err(ConfigError::env(
                    var,
                    "no [auth.custom] section to override",
                ))
            }
        },

        ["UPLOAD", "DIR"] => config.upload.dir = value.into(),
        ["UPLOAD", "MAX_FILE_BYTES"] => config.upload.max_file_bytes = parse_num(var, value)?,
        ["UPLOAD", "MAX_FIELDS"] => config.upload.max_fields = parse_num(var, value)?,
        ["UPLOAD", "MAX_FIELD_BYTES"] => config.upload.max_field_bytes = parse_num(var, value)?,

        ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
        ["LOGGING", "JSON_FORMAT"] => config.logging.json_format = parse_bool(var, value)?,

        ["METRICS", "ENABLED"] => config.metrics.enabled = parse_bool(var, value)?,
        ["METRICS", "ADDR"] => config.metrics.addr = value.to_string(),

        ["CORS", "ALLOW_ORIGIN"] => config.cors.allow_origin = value.to_string(),

        ["APP", key] => {
            config
                .app
                .insert(key.to_lowercase(), Value::String(value.to_string()));
        }

        _ => tracing::debug!(var, "ignoring unrecognised configuration override"),
    }
    Ok(())
}

fn parse_num<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env(var, "expected integer"))
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env(var, "expected boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn loader() -> ConfigLoader {
        ConfigLoader::new().with_env_vars([("TOLLGATE__AUTH__EXPECTED_AUDIENCE", "client-id")])
    }

    #[test]
    fn test_defaults_with_env_audience() {
        let config = loader().with_env_prefix("TOLLGATE").load().unwrap();
        assert_eq!(config.auth.expected_audience, "client-id");
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_toml_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [service]
            name = "games"

            [server]
            request_timeout_ms = 5000

            [auth]
            expected_audience = "games-client"
            min_client_version = "2.1.0"
            "#
        )
        .unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.service.name, "games");
        assert_eq!(config.server.request_timeout_ms, 5000);
        assert_eq!(config.server.upload_timeout_ms, 600_000);
        assert_eq!(config.auth.policy().min_client_version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn test_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"service": {{"name": "scores"}}, "auth": {{"require_auth": false}}}}"#
        )
        .unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.service.name, "scores");
        assert!(!config.auth.require_auth);
    }

    #[test]
    fn test_file_merges_over_preset() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string("[service]\nname = \"svc\"\n\n[server]\nmax_body_bytes = 2048", "toml")
            .unwrap()
            .load()
            .unwrap();

        let preset = TollgateConfig::development();
        assert_eq!(config.service.name, "svc");
        assert_eq!(config.server.max_body_bytes, 2048);
        assert_eq!(config.server.http_addr, preset.server.http_addr);
        assert_eq!(config.auth.require_auth, preset.auth.require_auth);
        assert_eq!(config.logging, preset.logging);
    }

    #[test]
    fn test_later_strings_merge_over_earlier_ones() {
        let config = ConfigLoader::new()
            .with_string(r#"{"auth": {"expected_audience": "a", "min_client_version": "1.0.0"}}"#, "json")
            .unwrap()
            .with_string("[auth]\nexpected_audience = \"b\"", "toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.auth.expected_audience, "b");
        assert_eq!(config.auth.min_client_version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_unknown_key_is_reported_in_file_format() {
        let err = ConfigLoader::new()
            .with_development()
            .with_string("[server]\nport = 80", "toml")
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Parse { format: "toml", .. }));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = ConfigLoader::new()
            .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
            .unwrap()
            .with_env_vars([
                ("TOLLGATE__AUTH__EXPECTED_AUDIENCE", "client-id"),
                ("TOLLGATE__SERVER__HTTP_ADDR", "127.0.0.1:4000"),
                ("TOLLGATE__AUTH__REQUIRE_CORRELATION_ID", "false"),
                ("TOLLGATE__APP__BUCKET", "kud-uploads"),
                ("OTHER__SERVER__HTTP_ADDR", "ignored"),
            ])
            .with_env_prefix("tollgate")
            .load()
            .unwrap();

        assert_eq!(config.server.http_addr, "127.0.0.1:4000");
        assert!(!config.auth.require_correlation_id);
        assert_eq!(
            config.app_setting::<String>("bucket").as_deref(),
            Some("kud-uploads")
        );
    }

    #[test]
    fn test_bad_env_value() {
        let err = loader()
            .with_env_vars([
                ("TOLLGATE__AUTH__EXPECTED_AUDIENCE", "client-id"),
                ("TOLLGATE__SERVER__REQUEST_TIMEOUT_MS", "soon"),
            ])
            .with_env_prefix("TOLLGATE")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        assert!(matches!(
            ConfigLoader::new().with_file("/nonexistent/tollgate.toml"),
            Err(ConfigError::NotFound { .. })
        ));

        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            ConfigLoader::new().with_file(file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        assert!(ConfigLoader::new()
            .with_optional_file("/nonexistent/tollgate.toml")
            .is_ok());
    }
}
