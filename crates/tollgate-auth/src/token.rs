//! Unverified credential inspection.
//!
//! Nothing read here is trusted. The claims only route the credential to a
//! verifier and feed diagnostics.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use tollgate_core::AuthFailure;

const REDACTED_PREFIX_LEN: usize = 10;

/// A token audience, which JWTs allow to be a string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience.
    Single(String),
    /// Several audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Returns true when `expected` is among the audiences.
    #[must_use]
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Self::Single(aud) => aud == expected,
            Self::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(aud) => f.write_str(aud),
            Self::Many(auds) => f.write_str(&auds.join(",")),
        }
    }
}

/// Claims read from a credential payload before verification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnverifiedClaims {
    /// Provider tag (`authProvider` claim).
    #[serde(rename = "authProvider")]
    pub provider_tag: Option<String>,
    /// Issuer (`iss`).
    pub iss: Option<String>,
    /// Audience (`aud`).
    pub aud: Option<Audience>,
    /// Subject (`sub`).
    pub sub: Option<String>,
}

impl UnverifiedClaims {
    /// Decodes the payload segment of a compact JWT.
    pub fn inspect(credential: &str) -> Result<Self, AuthFailure> {
        let mut segments = credential.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthFailure::Malformed(
                "credential is not a three-part token".to_string(),
            ));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthFailure::Malformed(format!("payload is not base64url: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| AuthFailure::Malformed(format!("payload is not a JSON object: {e}")))
    }
}

/// Strips the `Bearer` scheme from an authorization header value.
///
/// Returns `None` when the scheme is missing or the token is empty.
#[must_use]
pub fn strip_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Shortens a credential for use in messages and logs.
#[must_use]
pub fn redact(credential: &str) -> String {
    let prefix: String = credential.chars().take(REDACTED_PREFIX_LEN).collect();
    if prefix.len() < credential.len() {
        format!("{prefix}...")
    } else {
        "...".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_inspect_reads_provider_tag() {
        let claims =
            UnverifiedClaims::inspect(&token_with_payload(r#"{"authProvider":"toto","sub":"u1"}"#))
                .unwrap();
        assert_eq!(claims.provider_tag.as_deref(), Some("toto"));
        assert_eq!(claims.sub.as_deref(), Some("u1"));
    }

    #[test]
    fn test_inspect_reads_audience_array() {
        let claims = UnverifiedClaims::inspect(&token_with_payload(
            r#"{"iss":"https://accounts.google.com","aud":["a","b"]}"#,
        ))
        .unwrap();
        assert!(claims.aud.unwrap().contains("b"));
        assert!(claims.provider_tag.is_none());
    }

    #[test]
    fn test_inspect_rejects_wrong_segment_count() {
        assert!(matches!(
            UnverifiedClaims::inspect("only.two"),
            Err(AuthFailure::Malformed(_))
        ));
        assert!(matches!(
            UnverifiedClaims::inspect("a.b.c.d"),
            Err(AuthFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_inspect_rejects_non_json_payload() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("not json"));
        assert!(matches!(
            UnverifiedClaims::inspect(&token),
            Err(AuthFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_strip_bearer() {
        assert_eq!(strip_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(strip_bearer("bearer  abc"), Some("abc"));
        assert_eq!(strip_bearer("Basic dXNlcg=="), None);
        assert_eq!(strip_bearer("Bearer "), None);
        assert_eq!(strip_bearer("abc"), None);
    }

    #[test]
    fn test_redact_never_returns_whole_credential() {
        assert_eq!(redact("eyJhbGciOiJIUzI1NiJ9.payload.sig"), "eyJhbGciOi...");
        assert_eq!(redact("short"), "...");
    }
}
