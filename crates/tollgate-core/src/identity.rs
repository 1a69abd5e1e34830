//! Verified caller identity.

use serde::{Deserialize, Serialize};

/// The identity of an authenticated caller.
///
/// An `Identity` is only ever produced by a successful
/// [`IdentityVerifier::verify`](crate::IdentityVerifier::verify) call and is
/// scoped to the request that presented the credential.
///
/// # Example
///
/// ```
/// use tollgate_core::Identity;
///
/// let identity = Identity::new("108223", "ada@example.com", "google");
/// assert_eq!(identity.subject_id(), "108223");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    subject_id: String,
    email: Option<String>,
    provider_tag: String,
}

impl Identity {
    /// Creates an identity with an email address.
    #[must_use]
    pub fn new(
        subject_id: impl Into<String>,
        email: impl Into<String>,
        provider_tag: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: Some(email.into()),
            provider_tag: provider_tag.into(),
        }
    }

    /// Creates an identity for a subject whose token carried no email claim.
    #[must_use]
    pub fn without_email(subject_id: impl Into<String>, provider_tag: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: None,
            provider_tag: provider_tag.into(),
        }
    }

    /// Returns the subject identifier (`sub` claim).
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Returns the email address, if the provider supplied one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the tag of the provider that verified this identity.
    #[must_use]
    pub fn provider_tag(&self) -> &str {
        &self.provider_tag
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider_tag, self.subject_id)
    }
}
