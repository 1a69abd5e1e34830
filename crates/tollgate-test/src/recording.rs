//! Recording doubles for the logger and verifier capabilities.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tollgate_core::{AuthFailure, Identity, IdentityVerifier, LogLevel, LoggerHandle};

/// One captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Correlation id the entry was tagged with.
    pub correlation_id: String,
    /// The message.
    pub message: String,
    /// Severity.
    pub level: LogLevel,
}

/// A logger that keeps every entry for later assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    /// An empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every entry so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries tagged with `correlation_id`.
    #[must_use]
    pub fn entries_for(&self, correlation_id: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.correlation_id == correlation_id)
            .cloned()
            .collect()
    }

    /// Whether any entry contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    /// Whether any entry at `level` contains `needle`.
    #[must_use]
    pub fn contains_at(&self, level: LogLevel, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }
}

impl LoggerHandle for RecordingLogger {
    fn log(&self, correlation_id: &str, message: &str, level: LogLevel) {
        self.entries.lock().push(LogEntry {
            correlation_id: correlation_id.to_string(),
            message: message.to_string(),
            level,
        });
    }
}

/// A verifier that counts its calls.
///
/// In accepting mode every credential yields an identity whose subject is
/// the credential itself; in rejecting mode every credential fails.
#[derive(Debug)]
pub struct CountingVerifier {
    tag: String,
    reject: Option<AuthFailure>,
    calls: AtomicUsize,
}

impl CountingVerifier {
    /// Accepts every credential.
    #[must_use]
    pub fn accepting(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            reject: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Rejects every credential with `failure`.
    #[must_use]
    pub fn rejecting(tag: impl Into<String>, failure: AuthFailure) -> Self {
        Self {
            tag: tag.into(),
            reject: Some(failure),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `verify` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for CountingVerifier {
    fn provider_tag(&self) -> &str {
        &self.tag
    }

    async fn verify(&self, credential: &str) -> Result<Identity, AuthFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reject {
            Some(failure) => Err(failure.clone()),
            None => Ok(Identity::without_email(credential, &self.tag)),
        }
    }
}
