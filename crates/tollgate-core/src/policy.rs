//! Validation policy and client version ordering.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// What the request validator demands of an inbound call.
///
/// # Example
///
/// ```
/// use tollgate_core::ValidationPolicy;
///
/// let policy = ValidationPolicy::default().with_min_client_version("1.4.0");
/// assert!(policy.require_auth);
/// assert!(policy.require_correlation_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Whether a verified bearer credential is required.
    pub require_auth: bool,
    /// Whether the correlation id header is required.
    pub require_correlation_id: bool,
    /// Minimum accepted client version, if any.
    pub min_client_version: Option<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            require_auth: true,
            require_correlation_id: true,
            min_client_version: None,
        }
    }
}

impl ValidationPolicy {
    /// A policy that demands nothing. Used by the liveness route.
    #[must_use]
    pub fn open() -> Self {
        Self {
            require_auth: false,
            require_correlation_id: false,
            min_client_version: None,
        }
    }

    /// Sets whether authentication is required.
    #[must_use]
    pub fn with_auth(mut self, required: bool) -> Self {
        self.require_auth = required;
        self
    }

    /// Sets whether the correlation id is required.
    #[must_use]
    pub fn with_correlation_id(mut self, required: bool) -> Self {
        self.require_correlation_id = required;
        self
    }

    /// Sets the minimum client version.
    #[must_use]
    pub fn with_min_client_version(mut self, version: impl Into<String>) -> Self {
        self.min_client_version = Some(version.into());
        self
    }

    /// Returns true when `presented` is below the configured minimum.
    ///
    /// An absent minimum accepts every version.
    #[must_use]
    pub fn rejects_version(&self, presented: &str) -> bool {
        self.min_client_version
            .as_deref()
            .is_some_and(|min| ClientVersion::new(presented) < ClientVersion::new(min))
    }
}

/// A client version string with numeric-aware ordering.
///
/// Dotted versions made only of numbers (`1.10.0`) compare segment by
/// segment, missing segments counting as zero. Anything else falls back to
/// plain string ordering.
#[derive(Debug, Clone, Copy)]
pub struct ClientVersion<'a>(&'a str);

impl<'a> ClientVersion<'a> {
    /// Wraps a version string.
    #[must_use]
    pub fn new(raw: &'a str) -> Self {
        Self(raw.trim())
    }

    fn numeric_segments(&self) -> Option<Vec<u64>> {
        self.0
            .trim_start_matches('v')
            .split('.')
            .map(|segment| segment.parse::<u64>().ok())
            .collect()
    }
}

impl Ord for ClientVersion<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_segments(), other.numeric_segments()) {
            (Some(left), Some(right)) => {
                let len = left.len().max(right.len());
                (0..len)
                    .map(|i| {
                        let l = left.get(i).copied().unwrap_or(0);
                        let r = right.get(i).copied().unwrap_or(0);
                        l.cmp(&r)
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            }
            _ => self.0.cmp(other.0),
        }
    }
}

impl PartialOrd for ClientVersion<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ClientVersion<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for ClientVersion<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_policy_requires_everything() {
        let policy = ValidationPolicy::default();
        assert!(policy.require_auth);
        assert!(policy.require_correlation_id);
        assert!(policy.min_client_version.is_none());
    }

    #[test]
    fn test_open_policy() {
        let policy = ValidationPolicy::open();
        assert!(!policy.require_auth);
        assert!(!policy.require_correlation_id);
    }

    #[test]
    fn test_rejects_lower_version() {
        let policy = ValidationPolicy::default().with_min_client_version("1.3.0");
        assert!(policy.rejects_version("1.2.9"));
        assert!(!policy.rejects_version("1.3.0"));
        assert!(!policy.rejects_version("1.4"));
    }

    #[test]
    fn test_numeric_segments_beat_string_order() {
        assert!(ClientVersion::new("1.10.0") > ClientVersion::new("1.9.0"));
        assert_eq!(ClientVersion::new("2.0"), ClientVersion::new("2.0.0"));
    }

    #[test]
    fn test_non_numeric_versions_fall_back_to_string_order() {
        assert!(ClientVersion::new("1.0.0-beta") < ClientVersion::new("1.0.0-rc"));
    }

    #[test]
    fn test_no_minimum_accepts_anything() {
        assert!(!ValidationPolicy::default().rejects_version("0.0.1"));
    }

    proptest! {
        #[test]
        fn prop_version_at_or_above_minimum_is_accepted(
            major in 0u64..50, minor in 0u64..50, patch in 0u64..50, bump in 0u64..5
        ) {
            let min = format!("{major}.{minor}.{patch}");
            let presented = format!("{major}.{minor}.{}", patch + bump);
            let policy = ValidationPolicy::default().with_min_client_version(min);
            prop_assert!(!policy.rejects_version(&presented));
        }

        #[test]
        fn prop_version_below_minimum_is_rejected(
            major in 0u64..50, minor in 1u64..50, patch in 0u64..50
        ) {
            let min = format!("{major}.{minor}.{patch}");
            let presented = format!("{major}.{}.{patch}", minor - 1);
            let policy = ValidationPolicy::default().with_min_client_version(min);
            prop_assert!(policy.rejects_version(&presented));
        }
    }
}
