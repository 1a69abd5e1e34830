//! The gateway: route table, per-call dispatcher and HTTP accept loop.
//!
//! A gateway is assembled with [`GatewayBuilder`], receives its
//! configuration once through [`Gateway::init`] (or [`Gateway::install`]),
//! and only then starts accepting connections.
//!
//! ```text
//! request ──► preflight? ──► ready? ──► route ──► spawn ┬─► validate ──► context ──► handler
//!                                                       │      (uploads: stage the body first)
//!                                                       └─ deadline ──► 504
//!                                         shape ◄─────────────────────────────────┘
//! ```

use crate::error::ServerError;
use crate::router::Router;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::static_files::StaticMount;
use bytes::Bytes;
use http::request::Parts;
use http::{Method, Request, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tollgate_auth::ProviderRegistry;
use tollgate_config::{ConfigSource, ServiceConfiguration};
use tollgate_core::{
    ApiRequest, ConfigurationHandle, CorrelationId, ExecutionContext, GateError, Handler,
    IdentityVerifier, LoggerHandle, StreamHandler, UploadHandler, ValidationPolicy,
};
use tollgate_extract::{stage_upload, UploadConfig};
use tollgate_middleware::{
    CallLine, CorsPolicy, InboundHeaders, Reply, RequestValidator, Response, ResponseShaper,
};
use tollgate_telemetry::metrics::{record_request, record_upload};
use tollgate_telemetry::{init_logging, init_metrics, TracingLogger};
use tracing::Instrument;

const READINESS_POLL: Duration = Duration::from_millis(300);
const UNMATCHED_ROUTE: &str = "<unmatched>";

enum Endpoint {
    Liveness,
    Json(Arc<dyn Handler>),
    Upload(Arc<dyn UploadHandler>),
    Stream {
        handler: Arc<dyn StreamHandler>,
        content_type: Option<String>,
    },
}

struct RouteEntry {
    endpoint: Endpoint,
    policy: Option<ValidationPolicy>,
}

enum Target {
    Route {
        entry: Arc<RouteEntry>,
        route: String,
        params: HashMap<String, String>,
    },
    Static {
        mount: StaticMount,
        relative: String,
    },
    Unmatched,
}

impl Target {
    fn label(&self) -> &str {
        match self {
            Self::Route { route, .. } => route,
            Self::Static { mount, .. } => mount.prefix(),
            Self::Unmatched => UNMATCHED_ROUTE,
        }
    }
}

/// Everything built from the loaded configuration.
struct Runtime {
    service: Arc<ServiceConfiguration>,
    service_name: Arc<str>,
    policy: ValidationPolicy,
    validator: RequestValidator,
    shaper: ResponseShaper,
    logger: Arc<dyn LoggerHandle>,
    upload: UploadConfig,
    max_body_bytes: usize,
    request_timeout: Duration,
    upload_timeout: Duration,
    shutdown_timeout: Duration,
    http_addr: String,
}

impl Runtime {
    fn context(&self, correlation_id: &CorrelationId, client_version: Option<&str>) -> ExecutionContext {
        let config: Arc<dyn ConfigurationHandle> = self.service.clone();
        ExecutionContext::build(
            Some(correlation_id.as_str()),
            client_version,
            Arc::clone(&self.service_name),
            config,
            Arc::clone(&self.logger),
        )
    }
}

struct Inner {
    router: Router<Arc<RouteEntry>>,
    mounts: Vec<StaticMount>,
    logger: Option<Arc<dyn LoggerHandle>>,
    builtin: Option<Arc<dyn IdentityVerifier>>,
    issuers: Option<Vec<String>>,
    custom: Option<Arc<dyn IdentityVerifier>>,
    runtime: OnceLock<Arc<Runtime>>,
    pending: ResponseShaper,
}

/// Builder for [`Gateway`].
///
/// ```rust
/// use async_trait::async_trait;
/// use tollgate_core::{ApiRequest, ExecutionContext, GateResult, Handler, Identity};
/// use tollgate_server::Gateway;
///
/// struct Scores;
///
/// #[async_trait]
/// impl Handler for Scores {
///     async fn handle(
///         &self,
///         request: ApiRequest,
///         _identity: Option<Identity>,
///         _ctx: &ExecutionContext,
///     ) -> GateResult<serde_json::Value> {
///         Ok(serde_json::json!({ "game": request.param("gameId") }))
///     }
/// }
///
/// let gateway = Gateway::builder()
///     .route(http::Method::GET, "/games/{gameId}/scores", Scores)
///     .build()
///     .unwrap();
/// assert!(!gateway.is_ready());
/// ```
#[derive(Default)]
pub struct GatewayBuilder {
    routes: Vec<(Method, String, RouteEntry)>,
    mounts: Vec<StaticMount>,
    logger: Option<Arc<dyn LoggerHandle>>,
    builtin: Option<Arc<dyn IdentityVerifier>>,
    issuers: Option<Vec<String>>,
    custom: Option<Arc<dyn IdentityVerifier>>,
}

impl GatewayBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, method: Method, path: &str, endpoint: Endpoint, policy: Option<ValidationPolicy>) -> Self {
        self.routes
            .push((method, path.to_string(), RouteEntry { endpoint, policy }));
        self
    }

    /// Binds a JSON handler under the process-wide validation policy.
    #[must_use]
    pub fn route(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.push(method, path, Endpoint::Json(Arc::new(handler)), None)
    }

    /// Binds a JSON handler with its own validation policy.
    #[must_use]
    pub fn route_with_policy(
        self,
        method: Method,
        path: &str,
        policy: ValidationPolicy,
        handler: impl Handler,
    ) -> Self {
        self.push(method, path, Endpoint::Json(Arc::new(handler)), Some(policy))
    }

    /// Binds a multipart upload handler to `POST path`.
    ///
    /// Headers are validated before the body is read; the handler runs once
    /// the file part has been fully staged.
    #[must_use]
    pub fn upload_route(self, path: &str, handler: impl UploadHandler) -> Self {
        self.push(Method::POST, path, Endpoint::Upload(Arc::new(handler)), None)
    }

    /// Binds a streaming handler to `GET path`.
    #[must_use]
    pub fn stream_route(self, path: &str, handler: impl StreamHandler, content_type: Option<&str>) -> Self {
        let endpoint = Endpoint::Stream {
            handler: Arc::new(handler),
            content_type: content_type.map(ToString::to_string),
        };
        self.push(Method::GET, path, endpoint, None)
    }

    /// Serves the files under `folder` at `prefix`, without validation.
    #[must_use]
    pub fn static_content(mut self, prefix: &str, folder: impl Into<std::path::PathBuf>) -> Self {
        self.mounts.push(StaticMount::new(prefix, folder));
        self
    }

    /// Replaces the default `tracing` logger.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn LoggerHandle>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replaces the built-in verifier built from `[auth.builtin]`.
    ///
    /// Untagged tokens are still routed to it by the issuers listed in
    /// `[auth.builtin].issuers` unless [`well_known_issuers`](Self::well_known_issuers)
    /// names others.
    #[must_use]
    pub fn builtin_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.builtin = Some(verifier);
        self
    }

    /// Issuers whose untagged tokens go to the built-in verifier, replacing
    /// `[auth.builtin].issuers`.
    #[must_use]
    pub fn well_known_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issuers = Some(issuers.into_iter().map(Into::into).collect());
        self
    }

    /// Registers a custom verifier, replacing one built from `[auth.custom]`.
    #[must_use]
    pub fn custom_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.custom = Some(verifier);
        self
    }

    /// Builds the route table. The liveness route `GET /` is always present.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Route`] for a duplicate or malformed route.
    pub fn build(self) -> Result<Gateway, ServerError> {
        let mut router = Router::new();
        let liveness = RouteEntry {
            endpoint: Endpoint::Liveness,
            policy: Some(ValidationPolicy::open()),
        };
        router.add(Method::GET, "/", Arc::new(liveness))?;
        for (method, path, entry) in self.routes {
            router.add(method, &path, Arc::new(entry))?;
        }

        let pending_logger = self
            .logger
            .clone()
            .unwrap_or_else(|| Arc::new(TracingLogger::new("tollgate")));

        Ok(Gateway {
            inner: Arc::new(Inner {
                router,
                mounts: self.mounts,
                logger: self.logger,
                builtin: self.builtin,
                issuers: self.issuers,
                custom: self.custom,
                runtime: OnceLock::new(),
                pending: ResponseShaper::new(pending_logger, CorsPolicy::default()),
            }),
        })
    }
}

/// A routed, validating HTTP entry point.
///
/// Cheap to clone; clones share the route table and configuration.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

impl Gateway {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Loads configuration from `source`, installs logging and metrics, and
    /// makes the gateway ready.
    pub async fn init(&self, source: &dyn ConfigSource) -> Result<(), ServerError> {
        tracing::info!(source = %source.describe(), "loading configuration");
        let config = source.load().await?;

        if let Err(e) = init_logging(&config.logging) {
            tracing::debug!(error = %e, "logging subscriber not installed");
        }
        if let Err(e) = init_metrics(&config.metrics) {
            tracing::warn!(error = %e, "metrics exporter not installed");
        }

        self.install(ServiceConfiguration::new(config)?)
    }

    /// Makes the gateway ready with an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Fails if the provider registry cannot be built or a configuration is
    /// already installed.
    pub fn install(&self, service: ServiceConfiguration) -> Result<(), ServerError> {
        if self.is_ready() {
            return Err(ServerError::AlreadyInitialized);
        }

        let service = match &self.inner.custom {
            Some(custom) => service.with_custom_verifier(Arc::clone(custom)),
            None => service,
        };
        let settings = service.settings().clone();
        let policy = service.auth_policy();

        let builtin = self
            .inner
            .builtin
            .clone()
            .unwrap_or_else(|| Arc::new(service.builtin_verifier()));
        let issuers = self
            .inner
            .issuers
            .clone()
            .unwrap_or_else(|| settings.auth.builtin.issuers.clone());
        let mut registry = ProviderRegistry::builder(builtin).well_known_issuers(issuers);
        if let Some(custom) = service.custom_verifier() {
            registry = registry.custom(custom)?;
        }
        let registry = Arc::new(registry.build());

        let service_name: Arc<str> = Arc::from(settings.service.name.as_str());
        let logger = self
            .inner
            .logger
            .clone()
            .unwrap_or_else(|| Arc::new(TracingLogger::new(Arc::clone(&service_name))));

        tracing::info!(
            service = %service_name,
            registry = ?registry,
            routes = self.inner.router.len(),
            "configuration installed"
        );

        let runtime = Runtime {
            service: Arc::new(service),
            service_name,
            policy,
            validator: RequestValidator::new(registry, Arc::clone(&logger)),
            shaper: ResponseShaper::new(Arc::clone(&logger), settings.cors.policy()),
            logger,
            upload: settings.upload.clone(),
            max_body_bytes: settings.server.max_body_bytes,
            request_timeout: settings.server.request_timeout(),
            upload_timeout: settings.server.upload_timeout(),
            shutdown_timeout: settings.server.shutdown_timeout(),
            http_addr: settings.server.http_addr.clone(),
        };
        self.inner
            .runtime
            .set(Arc::new(runtime))
            .map_err(|_| ServerError::AlreadyInitialized)
    }

    /// Whether configuration has been installed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.runtime.get().is_some()
    }

    /// The installed configuration.
    #[must_use]
    pub fn configuration(&self) -> Option<&ServiceConfiguration> {
        self.inner.runtime.get().map(|rt| rt.service.as_ref())
    }

    /// Registered `(method, pattern)` pairs, liveness first.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.inner
            .router
            .routes()
            .map(|(method, pattern)| (method.clone(), pattern.to_string()))
            .collect()
    }

    /// Handles one call and returns exactly one response.
    ///
    /// The call runs in its own task, so dropping the returned future (for
    /// example on client disconnect) does not cancel a dispatched handler.
    pub async fn dispatch<B>(&self, request: Request<B>) -> Response
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
    {
        let started = Instant::now();

        let Some(runtime) = self.inner.runtime.get().cloned() else {
            return self.not_ready(&request);
        };
        if request.method() == Method::OPTIONS {
            return runtime.shaper.preflight();
        }

        let (parts, body) = request.into_parts();
        let correlation_id = InboundHeaders::from_headers(&parts.headers)
            .correlation_id
            .map_or_else(CorrelationId::generate, CorrelationId::new);
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();

        runtime
            .logger
            .api_in(correlation_id.as_str(), method.as_str(), &path);

        let target = self.target_for(&method, &path);
        let route = target.label().to_string();
        let deadline = match &target {
            Target::Route { entry, .. } if matches!(entry.endpoint, Endpoint::Upload(_)) => {
                runtime.upload_timeout
            }
            _ => runtime.request_timeout,
        };

        let span = tracing::info_span!(
            "call",
            correlation_id = %correlation_id,
            method = %method,
            route = %route,
        );
        let task = {
            let gateway = self.clone();
            let runtime = Arc::clone(&runtime);
            let correlation_id = correlation_id.clone();
            tokio::spawn(
                async move {
                    let call = gateway.execute(&runtime, target, parts, body, &correlation_id);
                    tokio::time::timeout(deadline, call)
                        .await
                        .unwrap_or_else(|_| Err(GateError::timeout()))
                }
                .instrument(span),
            )
        };

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(GateError::unclassified(format!(
                "handler panicked: {}",
                panic_message(e.into_panic())
            ))),
            Err(e) => Err(GateError::unclassified_with_source("call task failed", e)),
        };

        let call = CallLine {
            correlation_id: &correlation_id,
            method: &method,
            path: &path,
        };
        let response = runtime.shaper.shape(&call, outcome);
        record_request(
            method.as_str(),
            &route,
            response.status().as_u16(),
            started.elapsed(),
        );
        response
    }

    fn not_ready<B>(&self, request: &Request<B>) -> Response {
        if request.method() == Method::OPTIONS {
            return self.inner.pending.preflight();
        }
        let correlation_id = CorrelationId::generate();
        let call = CallLine {
            correlation_id: &correlation_id,
            method: request.method(),
            path: request.uri().path(),
        };
        self.inner.pending.failure(
            &call,
            &GateError::runtime(StatusCode::SERVICE_UNAVAILABLE, "Service is starting"),
        )
    }

    fn target_for(&self, method: &Method, path: &str) -> Target {
        if let Some(found) = self.inner.router.match_route(method, path) {
            return Target::Route {
                entry: Arc::clone(found.target()),
                route: found.pattern().to_string(),
                params: found.into_params(),
            };
        }

        self.inner
            .mounts
            .iter()
            .filter_map(|mount| mount.strip(path).map(|relative| (mount, relative)))
            .max_by_key(|(mount, _)| mount.prefix().len())
            .map_or(Target::Unmatched, |(mount, relative)| Target::Static {
                mount: mount.clone(),
                relative: relative.to_string(),
            })
    }

    async fn execute<B>(
        &self,
        runtime: &Runtime,
        target: Target,
        parts: Parts,
        body: B,
        correlation_id: &CorrelationId,
    ) -> Result<Reply, GateError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
    {
        let (entry, route, params) = match target {
            Target::Route { entry, route, params } => (entry, route, params),
            Target::Static { mount, relative } => {
                let file = mount.serve(&parts.method, &relative).await?;
                return Ok(Reply::Stream {
                    body: file.body,
                    content_type: Some(file.content_type.to_string()),
                });
            }
            Target::Unmatched => {
                return Err(GateError::route_not_found(&parts.method, parts.uri.path()));
            }
        };

        let policy = entry.policy.as_ref().unwrap_or(&runtime.policy);
        let validated = runtime
            .validator
            .validate(&parts.headers, policy, correlation_id)
            .await?;

        match &entry.endpoint {
            Endpoint::Liveness => Ok(Reply::Json(serde_json::json!({
                "api": &*runtime.service_name,
                "status": "running",
            }))),
            Endpoint::Json(handler) => {
                let bytes = read_body(body, runtime.max_body_bytes).await?;
                let ctx = runtime.context(correlation_id, validated.client_version.as_deref());
                let request = ApiRequest::new(parts.method, &parts.uri, parts.headers, params, bytes);
                handler
                    .handle(request, validated.identity, &ctx)
                    .await
                    .map(Reply::Json)
            }
            Endpoint::Upload(handler) => {
                let upload = stage_upload(
                    &parts.headers,
                    body,
                    &runtime.upload,
                    correlation_id,
                    &*runtime.logger,
                )
                .await?;
                record_upload(&route, upload.size_bytes());

                let ctx = runtime.context(correlation_id, validated.client_version.as_deref());
                let request =
                    ApiRequest::new(parts.method, &parts.uri, parts.headers, params, Bytes::new());
                handler
                    .handle(request, upload, validated.identity, &ctx)
                    .await
                    .map(Reply::Json)
            }
            Endpoint::Stream {
                handler,
                content_type,
            } => {
                let bytes = read_body(body, runtime.max_body_bytes).await?;
                let ctx = runtime.context(correlation_id, validated.client_version.as_deref());
                let request = ApiRequest::new(parts.method, &parts.uri, parts.headers, params, bytes);
                let stream = handler.handle(request, validated.identity, &ctx).await?;
                Ok(Reply::Stream {
                    body: stream,
                    content_type: content_type.clone(),
                })
            }
        }
    }

    /// Serves HTTP on the configured address until `shutdown` fires.
    ///
    /// No connection is accepted before configuration is installed; until
    /// then readiness is polled every 300 ms.
    pub async fn serve(&self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let Some(runtime) = self.wait_ready(&shutdown).await else {
            return Ok(());
        };
        let listener = TcpListener::bind(runtime.http_addr.as_str())
            .await
            .map_err(|e| ServerError::bind(&runtime.http_addr, e))?;
        self.accept_loop(&runtime, listener, shutdown).await;
        Ok(())
    }

    /// Serves HTTP on an already bound listener until `shutdown` fires.
    pub async fn serve_on(&self, listener: TcpListener, shutdown: ShutdownSignal) {
        if let Some(runtime) = self.wait_ready(&shutdown).await {
            self.accept_loop(&runtime, listener, shutdown).await;
        }
    }

    /// Loads configuration from `source` while serving.
    ///
    /// The listener is only bound once loading succeeds. A loading failure
    /// stops the server and is returned.
    pub async fn launch<S>(&self, source: S, shutdown: ShutdownSignal) -> Result<(), ServerError>
    where
        S: ConfigSource + 'static,
    {
        let loading = {
            let gateway = self.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let result = gateway.init(&source).await;
                if let Err(e) = &result {
                    tracing::error!(error = %e, "configuration failed to load");
                    shutdown.trigger();
                }
                result
            })
        };

        let served = self.serve(shutdown).await;
        // Trigger and return share one poll, so a failed load is never lost to the abort.
        loading.abort();
        match loading.await {
            Ok(Err(e)) => Err(e),
            _ => served,
        }
    }

    /// [`launch`](Self::launch) with shutdown on SIGTERM or SIGINT.
    pub async fn run<S>(&self, source: S) -> Result<(), ServerError>
    where
        S: ConfigSource + 'static,
    {
        self.launch(source, ShutdownSignal::with_os_signals()).await
    }

    async fn wait_ready(&self, shutdown: &ShutdownSignal) -> Option<Arc<Runtime>> {
        loop {
            if let Some(runtime) = self.inner.runtime.get() {
                return Some(Arc::clone(runtime));
            }
            if shutdown.is_shutdown() {
                return None;
            }
            tracing::info!("waiting for configuration");
            tokio::select! {
                () = tokio::time::sleep(READINESS_POLL) => {}
                () = shutdown.recv() => return None,
            }
        }
    }

    async fn accept_loop(&self, runtime: &Runtime, listener: TcpListener, shutdown: ShutdownSignal) {
        let local = listener
            .local_addr()
            .map_or_else(|_| runtime.http_addr.clone(), |addr| addr.to_string());
        tracing::info!(addr = %local, service = %runtime.service_name, "listening");

        let tracker = ConnectionTracker::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let token = tracker.acquire();
                        let gateway = self.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            gateway.serve_connection(stream, remote, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => break,
            }
        }

        let timeout = runtime.shutdown_timeout;
        tracing::info!(
            active = tracker.active_connections(),
            ?timeout,
            "draining connections"
        );
        if tokio::time::timeout(timeout, tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }
        tracing::info!("server stopped");
    }

    async fn serve_connection(&self, stream: TcpStream, remote: SocketAddr, shutdown: ShutdownSignal) {
        let gateway = self.clone();
        let service = service_fn(move |request: Request<Incoming>| {
            let gateway = gateway.clone();
            async move { Ok::<_, Infallible>(gateway.dispatch(request).await) }
        });

        let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(connection);

        let mut draining = false;
        loop {
            tokio::select! {
                result = connection.as_mut() => {
                    if let Err(e) = result {
                        tracing::debug!(%remote, error = %e, "connection closed with error");
                    }
                    break;
                }
                () = shutdown.recv(), if !draining => {
                    draining = true;
                    connection.as_mut().graceful_shutdown();
                }
            }
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("routes", &self.routes())
            .field("mounts", &self.inner.mounts)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, GateError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    Limited::new(body, limit)
        .collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                GateError::payload_too_large(format!("Request body exceeds {limit} bytes"))
            } else {
                GateError::bad_request(format!("Failed to read request body: {e}"))
            }
        })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
