//! The control service: everything above the transport.
//!
//! Owns a [`ProtocolServer`], registers the two standard methods
//! (`list_tools`, `call_tool`) and the credential middleware, mints the
//! per-session credential, and drives the `Created → Listening → Closed`
//! lifecycle. Starting returns the pairing payload the operator hands to the
//! remote device.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::config::NetworkServerConfig;
use crate::credential::Credential;
use crate::pairing::PairingPayload;
use crate::rpc::envelope::RequestEnvelope;
use crate::rpc::error::RpcError;
use crate::rpc::registry::{HandlerRegistry, Next};
use crate::rpc::server::{ListeningServer, ProtocolError, ProtocolServer, RouterOptions, ServerInfo};
use crate::target::CapabilityTarget;
use crate::tools::{
    cursor_control_tool, dispatch_command, with_validation, ToolListing, CALL_TOOL, LIST_TOOLS,
};

/// Header carrying the per-session credential.
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("network server is disabled in configuration")]
    Disabled,

    #[error("control service is already listening")]
    AlreadyListening,

    #[error("cannot resolve listen address {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

enum Lifecycle {
    Created,
    Listening(ListeningServer),
    Closed,
}

/// Shared workspace bookkeeping updated by the hosting editor integration.
///
/// Single writer, read by at most one concurrent consumer; the lock keeps
/// that safe without further coordination.
#[derive(Debug, Default)]
pub struct WorkspaceState {
    last_modified_files: RwLock<Vec<String>>,
}

impl WorkspaceState {
    pub fn update_modified_files(&self, files: Vec<String>) {
        *self.last_modified_files.write() = files;
    }

    pub fn modified_files(&self) -> Vec<String> {
        self.last_modified_files.read().clone()
    }
}

/// Top-level remote control service.
pub struct ControlService {
    config: NetworkServerConfig,
    server: ProtocolServer,
    credential: Arc<RwLock<Credential>>,
    state: tokio::sync::Mutex<Lifecycle>,
    workspace: Arc<WorkspaceState>,
}

impl ControlService {
    /// Build the service: registry, standard methods, credential middleware.
    /// Nothing is bound until [`ControlService::start`].
    pub fn new(
        config: NetworkServerConfig,
        target: Arc<dyn CapabilityTarget>,
    ) -> Result<Self, ControlError> {
        let credential = Arc::new(RwLock::new(Credential::generate()));
        let mut registry = HandlerRegistry::new();

        // Credential gate: runs before any handler, so a rejected request
        // has no side effects.
        let auth_credential = Arc::clone(&credential);
        registry.use_middleware(move |envelope: RequestEnvelope, next: Next| {
            let credential = Arc::clone(&auth_credential);
            async move {
                let authorized = envelope
                    .header(API_KEY_HEADER)
                    .map(|presented| credential.read().matches(presented))
                    .unwrap_or(false);
                if authorized {
                    next.run(envelope).await
                } else {
                    Err(RpcError::Unauthorized)
                }
            }
        });

        registry.register(LIST_TOOLS, |_envelope: RequestEnvelope| async {
            let listing = ToolListing {
                tools: vec![cursor_control_tool()],
            };
            serde_json::to_value(listing).map_err(|_| RpcError::Internal)
        });

        let call_target = Arc::clone(&target);
        registry.register(
            CALL_TOOL,
            with_validation(
                crate::tools::cursor_control_schema(),
                move |envelope: RequestEnvelope| {
                    let target = Arc::clone(&call_target);
                    async move {
                        let command = envelope
                            .arguments
                            .get("command")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        let args = envelope
                            .arguments
                            .get("args")
                            .cloned()
                            .unwrap_or(serde_json::Value::Null);
                        let response = dispatch_command(target.as_ref(), &command, &args).await?;
                        serde_json::to_value(response).map_err(|_| RpcError::Internal)
                    }
                },
            ),
        );

        let server = ProtocolServer::new(
            ServerInfo::new("edlink", env!("CARGO_PKG_VERSION")),
            registry,
        )?;

        Ok(Self {
            config,
            server,
            credential,
            state: tokio::sync::Mutex::new(Lifecycle::Created),
            workspace: Arc::new(WorkspaceState::default()),
        })
    }

    /// Bind the configured host/port, mint a fresh credential, and return
    /// the pairing payload. Fails (reported, not retried) if the network
    /// feature is disabled or the port is already bound.
    pub async fn start(&self) -> Result<PairingPayload, ControlError> {
        if !self.config.enabled {
            return Err(ControlError::Disabled);
        }

        let mut state = self.state.lock().await;
        if matches!(*state, Lifecycle::Listening(_)) {
            return Err(ControlError::AlreadyListening);
        }

        let addr = self.resolve_addr()?;
        *self.credential.write() = Credential::generate();

        if self.config.auth_token.is_some() {
            tracing::warn!(
                "both a static bearer token and a per-session credential are active; \
                 clients must present both (see DESIGN.md on unifying the two gates)"
            );
        }

        let listening = self.server.listen(addr, &self.router_options()).await?;
        let local_addr = listening.local_addr();
        *state = Lifecycle::Listening(listening);

        let payload = {
            let credential = self.credential.read();
            PairingPayload::new(&self.config.host, local_addr.port(), &credential)
        };
        tracing::info!(server = %payload.server, "remote control server started");
        Ok(payload)
    }

    /// Stop listening and drain in-flight requests. Idempotent: stopping a
    /// stopped (or never-started) service is a no-op.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let Lifecycle::Listening(listening) =
            std::mem::replace(&mut *state, Lifecycle::Closed)
        {
            listening.shutdown().await;
            tracing::info!("remote control server stopped");
        }
    }

    /// The address the service is currently bound to, if listening.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state.lock().await {
            Lifecycle::Listening(listening) => Some(listening.local_addr()),
            _ => None,
        }
    }

    /// The currently active credential, hex-encoded. Changes on every start.
    pub fn credential(&self) -> String {
        self.credential.read().expose().to_string()
    }

    pub fn workspace(&self) -> &WorkspaceState {
        &self.workspace
    }

    /// Router over the registered methods, for in-process testing and
    /// embedding without a bound socket.
    pub fn router(&self) -> axum::Router {
        self.server.router(&self.router_options())
    }

    fn router_options(&self) -> RouterOptions {
        RouterOptions {
            bearer_token: self.config.auth_token.clone(),
            cors_origins: self.config.cors_origins.clone(),
            rate_limit: self.config.rate_limit,
        }
    }

    fn resolve_addr(&self) -> Result<SocketAddr, ControlError> {
        (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| {
                ControlError::InvalidAddress(format!("{}:{}", self.config.host, self.config.port))
            })
    }
}
