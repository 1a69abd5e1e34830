//! Static content mounts.
//!
//! A mount serves the files under a folder at a URL prefix. Mounted paths
//! are answered without request validation, for `GET` and `HEAD` only.
//! Parent-directory segments and hidden files are refused, and the
//! resolved file must stay inside the folder after symlinks are followed.

use bytes::BytesMut;
use futures_util::{stream, StreamExt};
use http::{Method, StatusCode};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tollgate_core::{ByteStream, GateError};

const READ_CHUNK: usize = 64 * 1024;

/// Why a mounted file could not be served.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// No such file.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The path is refused.
    #[error("Forbidden path: {0}")]
    Forbidden(String),

    /// Only `GET` and `HEAD` are served.
    #[error("Method {0} is not allowed on static content")]
    MethodNotAllowed(Method),

    /// The file exists but could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StaticFileError> for GateError {
    fn from(err: StaticFileError) -> Self {
        match err {
            StaticFileError::NotFound(_) => GateError::validation(StatusCode::NOT_FOUND, err.to_string()),
            StaticFileError::Forbidden(_) => GateError::validation(StatusCode::FORBIDDEN, err.to_string()),
            StaticFileError::MethodNotAllowed(_) => {
                GateError::validation(StatusCode::METHOD_NOT_ALLOWED, err.to_string())
            }
            StaticFileError::Io(e) => GateError::unclassified_with_source("static file read failed", e),
        }
    }
}

/// A file ready to be sent.
pub struct StaticFile {
    /// The file contents, empty for `HEAD`.
    pub body: ByteStream,
    /// `content-type` derived from the extension.
    pub content_type: &'static str,
    /// File size in bytes.
    pub len: u64,
}

impl std::fmt::Debug for StaticFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticFile")
            .field("content_type", &self.content_type)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// A folder served under a URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMount {
    prefix: String,
    root: PathBuf,
    index: Option<String>,
}

impl StaticMount {
    /// Mounts `root` at `prefix`. `index.html` answers directory requests.
    #[must_use]
    pub fn new(prefix: &str, root: impl Into<PathBuf>) -> Self {
        let trimmed = prefix.trim_matches('/');
        Self {
            prefix: format!("/{trimmed}"),
            root: root.into(),
            index: Some("index.html".to_string()),
        }
    }

    /// Sets or clears the file answering directory requests.
    #[must_use]
    pub fn with_index(mut self, index: Option<&str>) -> Self {
        self.index = index.map(ToString::to_string);
        self
    }

    /// The normalized URL prefix, always starting with `/`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The folder being served.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The part of `path` below this mount, if the mount covers it.
    #[must_use]
    pub fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefix == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    /// Opens the file at `relative` (a path below the prefix).
    pub async fn serve(&self, method: &Method, relative: &str) -> Result<StaticFile, StaticFileError> {
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed(method.clone()));
        }

        let mut path = self.resolve(relative).await?;
        let mut metadata = tokio::fs::metadata(&path).await?;
        if metadata.is_dir() {
            let index = self
                .index
                .as_ref()
                .ok_or_else(|| StaticFileError::NotFound(relative.to_string()))?;
            path = path.join(index);
            metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|_| StaticFileError::NotFound(relative.to_string()))?;
        }
        if !metadata.is_file() {
            return Err(StaticFileError::NotFound(relative.to_string()));
        }

        let content_type = content_type_for(&path);
        let body = if method == Method::HEAD {
            stream::empty().boxed()
        } else {
            file_stream(tokio::fs::File::open(&path).await?)
        };

        tracing::debug!(path = %path.display(), len = metadata.len(), "serving static file");
        Ok(StaticFile {
            body,
            content_type,
            len: metadata.len(),
        })
    }

    async fn resolve(&self, relative: &str) -> Result<PathBuf, StaticFileError> {
        let decoded = urlencoding::decode(relative)
            .map_err(|_| StaticFileError::Forbidden("path is not valid UTF-8".to_string()))?;
        let trimmed = decoded.trim_start_matches('/');

        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(name) => {
                    if name.to_string_lossy().starts_with('.') {
                        return Err(StaticFileError::Forbidden("hidden files are not served".to_string()));
                    }
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(StaticFileError::Forbidden("parent directory segments".to_string()));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StaticFileError::Forbidden("absolute paths".to_string()));
                }
            }
        }

        let root = tokio::fs::canonicalize(&self.root).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                tracing::warn!(root = %self.root.display(), "static mount folder is missing");
                StaticFileError::NotFound(relative.to_string())
            } else {
                StaticFileError::Io(e)
            }
        })?;
        let resolved = tokio::fs::canonicalize(root.join(trimmed))
            .await
            .map_err(|_| StaticFileError::NotFound(relative.to_string()))?;
        if !resolved.starts_with(&root) {
            return Err(StaticFileError::Forbidden("path escapes the mount".to_string()));
        }
        Ok(resolved)
    }
}

fn file_stream(file: tokio::fs::File) -> ByteStream {
    stream::try_unfold(file, |mut file| async move {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        let read = file.read_buf(&mut buf).await?;
        Ok((read > 0).then(|| (buf.freeze(), file)))
    })
    .boxed()
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
