//! Handler capabilities and the request view they receive.
//!
//! Three kinds of handler can be bound to a route:
//!
//! - [`Handler`] returns a JSON value, sent with `200 OK`
//! - [`UploadHandler`] additionally receives a [`StagedUpload`]
//! - [`StreamHandler`] returns a byte stream, sent as-is

use crate::context::ExecutionContext;
use crate::error::{GateError, GateResult};
use crate::identity::Identity;
use crate::upload::StagedUpload;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Body stream returned by a [`StreamHandler`].
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// The inbound request as seen by a handler.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    params: HashMap<String, String>,
    body: Bytes,
}

impl ApiRequest {
    /// Creates a request view.
    #[must_use]
    pub fn new(
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
        params: HashMap<String, String>,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(ToString::to_string),
            headers,
            params,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// A path parameter captured by the route pattern.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All captured path parameters.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Raw query string.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Deserializes the query string.
    pub fn query<T: DeserializeOwned>(&self) -> GateResult<T> {
        serde_urlencoded::from_str(self.query.as_deref().unwrap_or(""))
            .map_err(|e| GateError::bad_request(format!("Invalid query string: {e}")))
    }

    /// A single decoded query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(self.query.as_deref()?).ok()?;
        pairs.into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Raw body bytes. Empty for upload routes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> GateResult<T> {
        if self.body.is_empty() {
            return Err(GateError::bad_request("Request body is empty"));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| GateError::bad_request(format!("Invalid JSON body: {e}")))
    }
}

/// A business handler bound to a route.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use tollgate_core::{ApiRequest, ExecutionContext, GateResult, Handler, Identity};
///
/// struct WhoAmI;
///
/// #[async_trait]
/// impl Handler for WhoAmI {
///     async fn handle(
///         &self,
///         _request: ApiRequest,
///         identity: Option<Identity>,
///         _ctx: &ExecutionContext,
///     ) -> GateResult<serde_json::Value> {
///         Ok(serde_json::json!({ "user": identity.map(|i| i.subject_id().to_string()) }))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one call.
    async fn handle(
        &self,
        request: ApiRequest,
        identity: Option<Identity>,
        ctx: &ExecutionContext,
    ) -> GateResult<serde_json::Value>;
}

/// A handler bound to a multipart upload route.
#[async_trait]
pub trait UploadHandler: Send + Sync + 'static {
    /// Handles one call after the file part has been fully staged.
    async fn handle(
        &self,
        request: ApiRequest,
        upload: StagedUpload,
        identity: Option<Identity>,
        ctx: &ExecutionContext,
    ) -> GateResult<serde_json::Value>;
}

/// A handler whose response body is streamed.
#[async_trait]
pub trait StreamHandler: Send + Sync + 'static {
    /// Produces the response stream for one call.
    async fn handle(
        &self,
        request: ApiRequest,
        identity: Option<Identity>,
        ctx: &ExecutionContext,
    ) -> GateResult<ByteStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn request(uri: &str, body: &'static [u8]) -> ApiRequest {
        let uri: Uri = uri.parse().unwrap();
        ApiRequest::new(
            Method::POST,
            &uri,
            HeaderMap::new(),
            HashMap::from([("id".to_string(), "42".to_string())]),
            Bytes::from_static(body),
        )
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Page {
        page: u32,
        size: Option<u32>,
    }

    #[test]
    fn test_query_deserialization() {
        let req = request("/games/42?page=2&size=10", b"");
        assert_eq!(req.path(), "/games/42");
        assert_eq!(
            req.query::<Page>().unwrap(),
            Page {
                page: 2,
                size: Some(10)
            }
        );
        assert_eq!(req.query_param("size").as_deref(), Some("10"));
        assert_eq!(req.param("id"), Some("42"));
    }

    #[test]
    fn test_bad_query_is_validation_failure() {
        let req = request("/games?page=abc", b"");
        let err = req.query::<Page>().unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_json_body() {
        let req = request("/games", br#"{"page": 3}"#);
        assert_eq!(req.json::<Page>().unwrap().page, 3);
    }

    #[test]
    fn test_empty_json_body_is_rejected() {
        let req = request("/games", b"");
        assert!(matches!(
            req.json::<Page>(),
            Err(GateError::Validation { .. })
        ));
    }
}
