//! CORS headers and preflight handling.
//!
//! Tollgate services sit behind browser clients on arbitrary origins, so the
//! policy is permissive: every response carries the same allow headers and
//! every `OPTIONS` request is answered directly with `204 No Content`.

use crate::types::{empty_body, Response};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

/// CORS header names.
pub mod headers {
    use http::header::HeaderName;

    /// `Access-Control-Allow-Origin`
    pub const ALLOW_ORIGIN: HeaderName = http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
    /// `Access-Control-Allow-Headers`
    pub const ALLOW_HEADERS: HeaderName = http::header::ACCESS_CONTROL_ALLOW_HEADERS;
    /// `Access-Control-Allow-Methods`
    pub const ALLOW_METHODS: HeaderName = http::header::ACCESS_CONTROL_ALLOW_METHODS;
}

/// Default `Access-Control-Allow-Headers` value.
pub const DEFAULT_ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, \
    Authorization, x-correlation-id, x-msg-id, auth-provider, x-app-version, x-client, x-client-id";

/// Default `Access-Control-Allow-Methods` value.
pub const DEFAULT_ALLOW_METHODS: &str = "OPTIONS, GET, PUT, POST, DELETE";

/// The CORS headers stamped on every response.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    allow_headers: HeaderValue,
    allow_methods: HeaderValue,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_headers: HeaderValue::from_static(DEFAULT_ALLOW_HEADERS),
            allow_methods: HeaderValue::from_static(DEFAULT_ALLOW_METHODS),
        }
    }
}

impl CorsPolicy {
    /// Builds a policy from configured values.
    ///
    /// A value that is not a legal header value keeps the default.
    #[must_use]
    pub fn from_values(allow_origin: &str, allow_headers: &str, allow_methods: &str) -> Self {
        let defaults = Self::default();
        let parse = |value: &str, fallback: HeaderValue| {
            HeaderValue::from_str(value).unwrap_or_else(|_| {
                tracing::warn!(value, "ignoring invalid CORS header value");
                fallback
            })
        };
        Self {
            allow_origin: parse(allow_origin, defaults.allow_origin),
            allow_headers: parse(allow_headers, defaults.allow_headers),
            allow_methods: parse(allow_methods, defaults.allow_methods),
        }
    }

    /// Writes the CORS headers into `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        let pairs: [(HeaderName, &HeaderValue); 3] = [
            (headers::ALLOW_ORIGIN, &self.allow_origin),
            (headers::ALLOW_HEADERS, &self.allow_headers),
            (headers::ALLOW_METHODS, &self.allow_methods),
        ];
        for (name, value) in pairs {
            headers.insert(name, value.clone());
        }
    }

    /// The answer to an `OPTIONS` preflight request.
    #[must_use]
    pub fn preflight(&self) -> Response {
        let mut response = Response::new(empty_body());
        *response.status_mut() = StatusCode::NO_CONTENT;
        self.apply(response.headers_mut());
        response
    }

    /// The configured allowed origin.
    #[must_use]
    pub fn allow_origin(&self) -> &str {
        self.allow_origin.to_str().unwrap_or("*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let mut map = HeaderMap::new();
        CorsPolicy::default().apply(&mut map);

        assert_eq!(map.get(headers::ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(
            map.get(headers::ALLOW_METHODS).unwrap(),
            "OPTIONS, GET, PUT, POST, DELETE"
        );
        let allowed = map.get(headers::ALLOW_HEADERS).unwrap().to_str().unwrap();
        assert!(allowed.contains("x-correlation-id"));
        assert!(allowed.contains("x-app-version"));
        assert!(allowed.contains("Authorization"));
    }

    #[test]
    fn test_preflight_is_no_content() {
        let response = CorsPolicy::default().preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(headers::ALLOW_ORIGIN));
    }

    #[test]
    fn test_invalid_value_keeps_default() {
        let policy = CorsPolicy::from_values("https://app.example.com", "bad\nvalue", "GET");
        assert_eq!(policy.allow_origin(), "https://app.example.com");

        let mut map = HeaderMap::new();
        policy.apply(&mut map);
        assert!(map
            .get(headers::ALLOW_HEADERS)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("x-client-id"));
        assert_eq!(map.get(headers::ALLOW_METHODS).unwrap(), "GET");
    }
}
