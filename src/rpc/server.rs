//! HTTP transport for the protocol.
//!
//! One POST endpoint per method (`/mcp/{method}`): the body is parsed into a
//! request envelope, pushed through the registry's middleware chain, and the
//! handler's payload (or a structured error envelope) is written back. The
//! listener lifecycle is `bind → serve → shutdown`, with shutdown draining
//! in-flight connections for a bounded grace period before aborting.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::auth::require_bearer;
use super::envelope::{RequestBody, RequestEnvelope};
use super::error::RpcError;
use super::registry::HandlerRegistry;

/// How long shutdown waits for in-flight requests before aborting the
/// serve task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Identity advertised by the server. Both fields must be non-empty.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Transport-level options: outer bearer gate, CORS, and rate limiting.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    pub bearer_token: Option<String>,
    pub cors_origins: Vec<String>,
    pub rate_limit: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid server configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

#[derive(Clone)]
struct RpcState {
    registry: Arc<HandlerRegistry>,
}

/// The RPC transport: owns the handler registry and builds the axum router.
pub struct ProtocolServer {
    info: ServerInfo,
    registry: Arc<HandlerRegistry>,
}

impl ProtocolServer {
    pub fn new(info: ServerInfo, registry: HandlerRegistry) -> Result<Self, ProtocolError> {
        if info.name.is_empty() || info.version.is_empty() {
            return Err(ProtocolError::InvalidConfig(
                "name and version are required".to_string(),
            ));
        }
        Ok(Self {
            info,
            registry: Arc::new(registry),
        })
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Build the router. `/health` stays outside the bearer gate; everything
    /// under `/mcp` is protected when a token is configured.
    pub fn router(&self, options: &RouterOptions) -> Router {
        let state = RpcState {
            registry: Arc::clone(&self.registry),
        };

        let protected = Router::new()
            .route("/mcp/{method}", post(invoke))
            .with_state(state);

        let protected = if let Some(rps) = options.rate_limit.filter(|rps| *rps > 0) {
            use tower_governor::{
                governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor, GovernorLayer,
            };
            let governor_conf = Arc::new(
                GovernorConfigBuilder::default()
                    .per_second(u64::from(rps))
                    .burst_size(rps)
                    .key_extractor(PeerIpKeyExtractor)
                    .finish()
                    .unwrap(),
            );
            protected.layer(GovernorLayer::new(governor_conf))
        } else {
            protected
        };

        let protected = match &options.bearer_token {
            Some(token) => {
                let token = token.clone();
                protected.layer(axum::middleware::from_fn(move |req, next| {
                    let token = token.clone();
                    async move { require_bearer(token, req, next).await }
                }))
            }
            None => protected,
        };

        let router = Router::new()
            .route("/health", get(health))
            .merge(protected)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("no-referrer"),
            ));

        if options.cors_origins.is_empty() {
            router
        } else {
            let origins: Vec<HeaderValue> = options
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            router.layer(
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers([
                        header::AUTHORIZATION,
                        header::CONTENT_TYPE,
                        HeaderName::from_static("x-api-key"),
                    ]),
            )
        }
    }

    /// Bind `addr` and start serving. Fails if the port is already bound;
    /// the error is reported, not retried.
    pub async fn listen(
        &self,
        addr: SocketAddr,
        options: &RouterOptions,
    ) -> Result<ListeningServer, ProtocolError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ProtocolError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ProtocolError::Bind { addr, source })?;

        let app = self.router(options);
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(?e, "protocol server terminated with error");
            }
        });

        tracing::info!(server = %self.info.name, addr = %local_addr, "protocol server listening");

        Ok(ListeningServer {
            addr: local_addr,
            cancel,
            task: parking_lot::Mutex::new(Some(task)),
        })
    }
}

/// A bound, serving listener. Shutting down releases the socket; dropping
/// without an explicit shutdown cancels the serve task as well.
pub struct ListeningServer {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ListeningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and drain in-flight requests, aborting
    /// whatever is still running after the grace period. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(mut task) = task {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                tracing::warn!("in-flight requests did not drain in time, aborting");
                task.abort();
            }
        }
    }
}

impl Drop for ListeningServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Parse the body into an envelope and dispatch it through the registry.
async fn invoke(
    State(state): State<RpcState>,
    Path(method): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: RequestBody = if body.is_empty() {
        RequestBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return RpcError::InvalidInput(format!("Invalid request body: {}", e))
                    .into_response()
            }
        }
    };

    let header_pairs = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v.to_string())));
    let envelope = RequestEnvelope::new(method, header_pairs, body.arguments);

    match Arc::clone(&state.registry).dispatch(envelope).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => err.into_response(),
    }
}
