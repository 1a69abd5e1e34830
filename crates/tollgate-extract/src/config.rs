//! Upload limits and staging location.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default maximum size of the staged file (512 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 512 * 1024 * 1024;

/// Default maximum number of parts in one body.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// Default maximum size of a single text field (1 MiB).
pub const DEFAULT_MAX_FIELD_BYTES: usize = 1024 * 1024;

/// Configuration for upload staging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Directory staged files are written to. Created on first use.
    pub dir: PathBuf,
    /// Maximum size of the staged file in bytes.
    pub max_file_bytes: u64,
    /// Maximum number of parts, files included.
    pub max_fields: usize,
    /// Maximum size of one text field in bytes.
    pub max_field_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("tollgate-uploads"),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_fields: DEFAULT_MAX_FIELDS,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
        }
    }
}

impl UploadConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Sets the maximum file size.
    #[must_use]
    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Sets the maximum number of parts.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }

    /// Sets the maximum text field size.
    #[must_use]
    pub fn max_field_bytes(mut self, bytes: usize) -> Self {
        self.max_field_bytes = bytes;
        self
    }
}
