//! In-memory client.

use crate::error::TestError;
use crate::multipart::MultipartBody;
use crate::response::TestResponse;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request};
use http_body::Frame;
use http_body_util::StreamBody;
use serde::Serialize;
use std::convert::Infallible;
use tollgate_config::{ServiceConfiguration, TollgateConfig};
use tollgate_core::headers::{APP_VERSION, BEARER_PREFIX, CORRELATION_ID};
use tollgate_server::{Gateway, GatewayBuilder};

/// The request body type the client sends: a stream of data frames.
pub type TestBody = StreamBody<BoxStream<'static, Result<Frame<Bytes>, Infallible>>>;

fn body_of(chunks: Vec<Bytes>) -> TestBody {
    StreamBody::new(stream::iter(chunks.into_iter().map(|c| Ok(Frame::data(c)))).boxed())
}

/// Drives a [`Gateway`] without sockets.
///
/// Requests go through the same dispatcher a real connection uses:
/// routing, validation, deadlines and response shaping.
///
/// ```rust,ignore
/// let client = TestClient::with_config(Gateway::builder(), TollgateConfig::development())?;
/// let response = client.get("/").send().await?;
/// response.assert_status(200);
/// ```
#[derive(Debug, Clone)]
pub struct TestClient {
    gateway: Gateway,
}

impl TestClient {
    /// Wraps a gateway, ready or not.
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Builds the gateway and installs `config` into it.
    pub fn with_config(builder: GatewayBuilder, config: TollgateConfig) -> Result<Self, TestError> {
        let gateway = builder.build()?;
        gateway.install(ServiceConfiguration::new(config)?)?;
        Ok(Self::new(gateway))
    }

    /// The wrapped gateway.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Starts a request.
    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> TestRequestBuilder<'_> {
        TestRequestBuilder {
            client: self,
            method,
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            chunks: Vec::new(),
            error: None,
        }
    }

    /// Starts a `GET`.
    #[must_use]
    pub fn get(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::GET, path)
    }

    /// Starts a `POST`.
    #[must_use]
    pub fn post(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::POST, path)
    }

    /// Starts a `PUT`.
    #[must_use]
    pub fn put(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::PUT, path)
    }

    /// Starts a `DELETE`.
    #[must_use]
    pub fn delete(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::DELETE, path)
    }

    /// Starts an `OPTIONS`.
    #[must_use]
    pub fn options(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::OPTIONS, path)
    }
}

/// A request being assembled.
#[must_use]
pub struct TestRequestBuilder<'a> {
    client: &'a TestClient,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    chunks: Vec<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder<'_> {
    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets `authorization: Bearer <token>`.
    pub fn bearer(self, token: &str) -> Self {
        self.header(AUTHORIZATION.as_str(), format!("{BEARER_PREFIX}{token}"))
    }

    /// Sets `x-correlation-id`.
    pub fn correlation_id(self, id: &str) -> Self {
        self.header(CORRELATION_ID, id)
    }

    /// Sets `x-app-version`.
    pub fn app_version(self, version: &str) -> Self {
        self.header(APP_VERSION, version)
    }

    /// Adds a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sends `value` as a JSON body in one chunk.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(encoded) => {
                self.chunks = vec![Bytes::from(encoded)];
                self.header(CONTENT_TYPE.as_str(), "application/json")
            }
            Err(e) => {
                self.error = Some(e.into());
                self
            }
        }
    }

    /// Sends raw bytes in one chunk.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.chunks = vec![body.into()];
        self
    }

    /// Sends a multipart body in its configured chunks.
    pub fn multipart(mut self, body: &MultipartBody) -> Self {
        self.chunks = body.chunks();
        self.header(CONTENT_TYPE.as_str(), body.content_type())
    }

    /// Assembles the HTTP request.
    pub fn build(self) -> Result<Request<TestBody>, TestError> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut uri = self.path;
        if !self.query.is_empty() {
            let encoded: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            uri = format!("{uri}?{}", encoded.join("&"));
        }

        let mut builder = Request::builder().method(self.method).uri(uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(body_of(self.chunks))
            .map_err(|e| TestError::RequestBuild(e.to_string()))
    }

    /// Dispatches the request and collects the response.
    pub async fn send(self) -> Result<TestResponse, TestError> {
        let gateway = self.client.gateway.clone();
        let request = self.build()?;
        TestResponse::from_http(gateway.dispatch(request).await).await
    }
}
