//! Staged multipart uploads.

use crate::error::GateError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// A fully received uploaded file plus its sibling form fields.
///
/// The staged file is removed from disk when the `StagedUpload` is dropped.
/// That covers handler failures, timeouts and panics as well as handlers
/// that simply ignore the file. A handler that needs the file beyond the
/// call must [`persist`](Self::persist) or [`keep`](Self::keep) it.
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
    original_filename: String,
    field_name: String,
    content_type: Option<String>,
    extra_fields: HashMap<String, String>,
    size_bytes: u64,
    chunk_count: usize,
}

impl StagedUpload {
    /// Wraps a staged temporary file.
    #[must_use]
    pub fn new(path: TempPath, original_filename: impl Into<String>) -> Self {
        Self {
            path,
            original_filename: original_filename.into(),
            field_name: String::new(),
            content_type: None,
            extra_fields: HashMap::new(),
            size_bytes: 0,
            chunk_count: 0,
        }
    }

    /// Sets the form field name the file arrived under.
    #[must_use]
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Sets the declared content type of the file part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    /// Sets the buffered non-file fields.
    #[must_use]
    pub fn with_extra_fields(mut self, fields: HashMap<String, String>) -> Self {
        self.extra_fields = fields;
        self
    }

    /// Records how many bytes were written, and in how many writes.
    #[must_use]
    pub fn with_stats(mut self, size_bytes: u64, chunk_count: usize) -> Self {
        self.size_bytes = size_bytes;
        self.chunk_count = chunk_count;
        self
    }

    /// Path of the staged file.
    #[must_use]
    pub fn temporary_path(&self) -> &Path {
        &self.path
    }

    /// File name as sent by the client.
    #[must_use]
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// Form field name of the file part.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Declared content type of the file part.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// All non-file form fields.
    #[must_use]
    pub fn extra_fields(&self) -> &HashMap<String, String> {
        &self.extra_fields
    }

    /// A single non-file form field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.extra_fields.get(name).map(String::as_str)
    }

    /// Number of bytes staged.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Number of chunk writes it took to stage the file.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Moves the staged file to `target` and disarms cleanup.
    pub fn persist(self, target: impl AsRef<Path>) -> Result<PathBuf, GateError> {
        let target = target.as_ref().to_path_buf();
        self.path
            .persist(&target)
            .map_err(|e| GateError::unclassified_with_source("failed to persist upload", e.error))?;
        Ok(target)
    }

    /// Disarms cleanup and returns the staged path.
    pub fn keep(self) -> Result<PathBuf, GateError> {
        self.path
            .keep()
            .map_err(|e| GateError::unclassified_with_source("failed to keep upload", e.error))
    }
}
