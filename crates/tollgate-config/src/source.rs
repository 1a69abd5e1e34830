//! Asynchronous configuration sources.
//!
//! A gateway does not accept connections until its configuration has been
//! loaded. Sources are async so that loading may wait on I/O.

use crate::config::TollgateConfig;
use crate::error::ConfigError;
use crate::loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Somewhere a [`TollgateConfig`] can be loaded from.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Loads and validates the configuration.
    async fn load(&self) -> Result<TollgateConfig, ConfigError>;

    /// Describes the source for log messages.
    fn describe(&self) -> String;
}

/// Loads from an optional file, `.env` and environment overrides.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: Option<PathBuf>,
    env_prefix: String,
    dotenv: bool,
}

impl FileConfigSource {
    /// A source reading `path`, which must exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            dotenv: true,
        }
    }

    /// A source reading only defaults and the environment.
    #[must_use]
    pub fn env_only() -> Self {
        Self {
            path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            dotenv: true,
        }
    }

    /// Sets the environment override prefix.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Disables `.env` loading.
    #[must_use]
    pub fn without_dotenv(mut self) -> Self {
        self.dotenv = false;
        self
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> Result<TollgateConfig, ConfigError> {
        let mut loader = ConfigLoader::new();
        if self.dotenv {
            loader = loader.with_dotenv();
        }

        if let Some(path) = &self.path {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConfigError::not_found(path)
                } else {
                    ConfigError::unreadable(path, e)
                }
            })?;
            let format = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_string();
            loader = loader.with_string(&content, &format)?;
        }

        loader.with_env_prefix(&self.env_prefix).load()
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("file {} + env {}", path.display(), self.env_prefix),
            None => format!("env {}", self.env_prefix),
        }
    }
}

/// A fixed configuration, optionally delivered after a delay.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    config: TollgateConfig,
    delay: Option<Duration>,
}

impl StaticConfigSource {
    /// Wraps a configuration.
    #[must_use]
    pub fn new(config: TollgateConfig) -> Self {
        Self {
            config,
            delay: None,
        }
    }

    /// Delays delivery, simulating a slow secret store.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn load(&self) -> Result<TollgateConfig, ConfigError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.config.validate()?;
        Ok(self.config.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}
