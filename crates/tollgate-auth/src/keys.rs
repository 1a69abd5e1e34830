//! Signing key sources for the built-in verifier.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tollgate_core::AuthFailure;

/// Google's published OAuth2 signing keys.
pub const DEFAULT_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const MAX_CACHED_KEYS: usize = 32;

/// Supplies the key that verifies a token's signature.
#[async_trait]
pub trait KeySource: Send + Sync + 'static {
    /// Returns the decoding key for the token's `kid` header.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthFailure>;
}

/// A fixed set of keys, typically an HMAC secret or a pinned public key.
#[derive(Clone, Default)]
pub struct StaticKeySource {
    keys: HashMap<String, DecodingKey>,
    fallback: Option<DecodingKey>,
}

impl StaticKeySource {
    /// A source that answers every `kid` with the same key.
    #[must_use]
    pub fn single(key: DecodingKey) -> Self {
        Self {
            keys: HashMap::new(),
            fallback: Some(key),
        }
    }

    /// Adds a key for a specific `kid`.
    #[must_use]
    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthFailure> {
        kid.and_then(|kid| self.keys.get(kid))
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| AuthFailure::Rejected(format!("unknown signing key {kid:?}")))
    }
}

impl std::fmt::Debug for StaticKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeySource")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Keys fetched from a JWKS endpoint and cached.
///
/// The cache holds at most a fixed number of keys and is replaced wholesale
/// on refresh. It refreshes when its TTL lapses, or when a token names an
/// unknown `kid` and the last fetch is older than the minimum refresh
/// interval.
pub struct JwksKeySource {
    url: String,
    ttl: Duration,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl JwksKeySource {
    /// Creates a source for the given JWKS URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ttl: DEFAULT_TTL,
            client: reqwest::Client::new(),
            cache: RwLock::new(None),
        }
    }

    /// Sets the cache TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the JWKS URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of keys currently cached.
    #[must_use]
    pub fn cached_key_count(&self) -> usize {
        self.cache.read().as_ref().map_or(0, |cached| cached.keys.len())
    }

    fn lookup(&self, kid: Option<&str>) -> Lookup {
        let guard = self.cache.read();
        let Some(cached) = guard.as_ref() else {
            return Lookup::Refresh;
        };
        let age = cached.fetched_at.elapsed();
        if age >= self.ttl {
            return Lookup::Refresh;
        }
        let found = match kid {
            Some(kid) => cached.keys.get(kid),
            None if cached.keys.len() == 1 => cached.keys.values().next(),
            None => None,
        };
        match found {
            Some(key) => Lookup::Hit(key.clone()),
            None if age >= MIN_REFRESH_INTERVAL => Lookup::Refresh,
            None => Lookup::Miss,
        }
    }

    async fn refresh(&self) -> Result<(), AuthFailure> {
        tracing::debug!(url = %self.url, "fetching signing keys");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthFailure::Unavailable(format!("key fetch failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AuthFailure::Unavailable(format!(
                "key endpoint answered {}",
                response.status()
            )));
        }
        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthFailure::Unavailable(format!("invalid key set: {e}")))?;

        let keys: HashMap<String, DecodingKey> = set
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.common.key_id.clone()?;
                match DecodingKey::from_jwk(jwk) {
                    Ok(key) => Some((kid, key)),
                    Err(e) => {
                        tracing::warn!(kid = %kid, error = %e, "skipping unusable signing key");
                        None
                    }
                }
            })
            .take(MAX_CACHED_KEYS)
            .collect();

        tracing::info!(url = %self.url, keys = keys.len(), "signing keys refreshed");
        *self.cache.write() = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

enum Lookup {
    Hit(DecodingKey),
    Miss,
    Refresh,
}

#[async_trait]
impl KeySource for JwksKeySource {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthFailure> {
        match self.lookup(kid) {
            Lookup::Hit(key) => return Ok(key),
            Lookup::Miss => {
                return Err(AuthFailure::Rejected(format!("unknown signing key {kid:?}")))
            }
            Lookup::Refresh => self.refresh().await?,
        }
        match self.lookup(kid) {
            Lookup::Hit(key) => Ok(key),
            Lookup::Miss | Lookup::Refresh => {
                Err(AuthFailure::Rejected(format!("unknown signing key {kid:?}")))
            }
        }
    }
}

impl std::fmt::Debug for JwksKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksKeySource")
            .field("url", &self.url)
            .field("ttl", &self.ttl)
            .field("cached_keys", &self.cached_key_count())
            .finish_non_exhaustive()
    }
}
