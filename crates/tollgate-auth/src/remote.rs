//! Custom verifier backed by a remote auth service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tollgate_core::{AuthFailure, Identity, IdentityVerifier};

#[derive(Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "idToken")]
    id_token: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    sub: String,
    email: Option<String>,
    #[serde(rename = "authProvider")]
    auth_provider: Option<String>,
}

/// Delegates verification to `POST {endpoint}/verify`.
///
/// The endpoint receives `{"idToken": "<credential>"}` and answers with
/// `{"sub", "email", "authProvider"}` on success. Any 4xx answer rejects
/// the credential; 5xx answers and transport errors mark the verifier as
/// unavailable.
#[derive(Debug, Clone)]
pub struct RemoteVerifier {
    tag: String,
    verify_url: String,
    client: reqwest::Client,
}

impl RemoteVerifier {
    /// Creates a verifier for the given tag and auth service base URL.
    pub fn new(
        tag: impl Into<String>,
        endpoint: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            tag: tag.into(),
            verify_url: format!("{}/verify", endpoint.as_ref().trim_end_matches('/')),
            client,
        })
    }

    /// The full verification URL.
    #[must_use]
    pub fn verify_url(&self) -> &str {
        &self.verify_url
    }
}

#[async_trait]
impl IdentityVerifier for RemoteVerifier {
    fn provider_tag(&self) -> &str {
        &self.tag
    }

    async fn verify(&self, credential: &str) -> Result<Identity, AuthFailure> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&VerifyRequest {
                id_token: credential,
            })
            .send()
            .await
            .map_err(|e| AuthFailure::Unavailable(format!("auth service unreachable: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthFailure::Rejected(format!(
                "auth service refused the credential ({status})"
            )));
        }
        if !status.is_success() {
            return Err(AuthFailure::Unavailable(format!(
                "auth service answered {status}"
            )));
        }

        let verdict: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AuthFailure::Unavailable(format!("invalid auth service answer: {e}")))?;

        let provider = verdict.auth_provider.unwrap_or_else(|| self.tag.clone());
        Ok(match verdict.email {
            Some(email) => Identity::new(verdict.sub, email, provider),
            None => Identity::without_email(verdict.sub, provider),
        })
    }
}
