//! `CstaServer` builder and accept loop.
//!
//! This is the entry point for running a stub switch. It ties together
//! the layers: transport → protocol → per-connection session → registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use csta_protocol::{DmccAdapter, MessageRegistry, ProtocolVersion, ServerAdapter};
use csta_registry::ResourceRegistry;
use csta_transport::{CstaListener, TlsServerConfig, Transport, TransportError};
use rand::Rng;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::CstaError;
use crate::handler::handle_connection;

/// Base of the status-register ids handed out by a server.
pub const REGISTER_ID_BASE: u32 = 50_000;

/// Duration granted when a session start does not ask for one.
pub const DEFAULT_SESSION_DURATION: u32 = 180;

/// The switch identity and per-connection policies.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub tls: Option<TlsServerConfig>,
    /// Name clients must present in `SystemRegister` and device requests.
    pub switch_name: String,
    /// Address clients may present in `GetDeviceId` instead of the name.
    pub switch_address: String,
    /// Create unknown extensions on `GetThirdPartyDeviceId`.
    pub auto_provision: bool,
    /// Free a connection's devices when it ends.
    pub release_on_disconnect: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4721".to_string(),
            tls: None,
            switch_name: "CM".to_string(),
            switch_address: "127.0.0.1".to_string(),
            auto_provision: false,
            release_on_disconnect: true,
        }
    }
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) adapters: Vec<Arc<dyn ServerAdapter>>,
    pub(crate) resources: Arc<ResourceRegistry>,
    pub(crate) messages: MessageRegistry,
    register_ids: AtomicU32,
    session_seq: AtomicU64,
}

impl ServerState {
    pub(crate) fn new(
        config: ServerConfig,
        adapters: Vec<Arc<dyn ServerAdapter>>,
        resources: Arc<ResourceRegistry>,
    ) -> Self {
        Self {
            config,
            adapters,
            resources,
            messages: MessageRegistry::default(),
            register_ids: AtomicU32::new(0),
            session_seq: AtomicU64::new(0),
        }
    }

    /// `50000 + n` for the n-th registration on this server.
    pub(crate) fn next_register_id(&self) -> String {
        let n = self.register_ids.fetch_add(1, Ordering::Relaxed) + 1;
        REGISTER_ID_BASE.saturating_add(n).to_string()
    }

    /// 128 random bits in GUID grouping, suffixed with a sequence number.
    pub(crate) fn next_session_id(&self) -> String {
        let seq = self.session_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let bytes: [u8; 16] = rand::rng().random();
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        format!(
            "{}-{}-{}-{}-{}-{seq}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

/// Builder for configuring and starting a [`CstaServer`].
///
/// # Example
///
/// ```rust,ignore
/// use csta::prelude::*;
///
/// let resources = Arc::new(ResourceRegistry::new());
/// resources.add_extension("1233", "S1", "10.0.0.1").await?;
///
/// let server = CstaServer::builder()
///     .bind("0.0.0.0:4721")
///     .switch_name("S1")
///     .switch_address("10.0.0.1")
///     .resources(resources)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct CstaServerBuilder {
    config: ServerConfig,
    adapters: Vec<Arc<dyn ServerAdapter>>,
    resources: Option<Arc<ResourceRegistry>>,
}

impl CstaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            adapters: Vec::new(),
            resources: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Serves TLS instead of plain TCP.
    pub fn tls(mut self, tls: TlsServerConfig) -> Self {
        self.config.tls = Some(tls);
        self
    }

    pub fn switch_name(mut self, name: &str) -> Self {
        self.config.switch_name = name.to_string();
        self
    }

    pub fn switch_address(mut self, address: &str) -> Self {
        self.config.switch_address = address.to_string();
        self
    }

    /// Adds a supported protocol adapter. Without any, v63 is served.
    pub fn adapter(mut self, adapter: Arc<dyn ServerAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Shorthand for [`adapter`](Self::adapter) with a [`DmccAdapter`].
    pub fn version(self, version: ProtocolVersion) -> Self {
        self.adapter(Arc::new(DmccAdapter::new(version)))
    }

    /// Shares an existing registry with the server.
    pub fn resources(mut self, resources: Arc<ResourceRegistry>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn auto_provision(mut self, enabled: bool) -> Self {
        self.config.auto_provision = enabled;
        self
    }

    pub fn release_on_disconnect(mut self, enabled: bool) -> Self {
        self.config.release_on_disconnect = enabled;
        self
    }

    /// Binds the listener.
    pub async fn build(self) -> Result<CstaServer, CstaError> {
        let listener =
            CstaListener::bind(&self.config.bind_addr, self.config.tls.as_ref()).await?;

        let mut adapters = self.adapters;
        if adapters.is_empty() {
            adapters.push(Arc::new(DmccAdapter::default()));
        }
        let versions: Vec<_> = adapters.iter().map(|a| a.version().tag()).collect();
        tracing::info!(
            switch_name = %self.config.switch_name,
            switch_address = %self.config.switch_address,
            ?versions,
            "stub switch configured"
        );

        let resources = self.resources.unwrap_or_default();
        let state = Arc::new(ServerState::new(self.config, adapters, resources));

        Ok(CstaServer {
            listener,
            state,
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for CstaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound stub switch.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CstaServer {
    listener: CstaListener,
    state: Arc<ServerState>,
    shutdown: CancellationToken,
}

impl CstaServer {
    /// Creates a new builder.
    pub fn builder() -> CstaServerBuilder {
        CstaServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The registry shared by every connection.
    pub fn resources(&self) -> Arc<ResourceRegistry> {
        Arc::clone(&self.state.resources)
    }

    /// Cancelling this token stops the accept loop and every connection.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the accept loop until the shutdown token is cancelled.
    ///
    /// Each accepted connection gets its own task, which also runs the TLS
    /// handshake. On shutdown the listener is closed, and the connection
    /// tasks are told to stop and awaited before this returns.
    pub async fn run(mut self) -> Result<(), CstaError> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "stub switch running");
        let mut connections = JoinSet::new();

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    let stop = self.shutdown.child_token();
                    connections.spawn(async move {
                        let peer = incoming.peer_addr();
                        if let Err(e) = handle_connection(incoming, state, stop).await {
                            tracing::debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(TransportError::Shutdown) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }

            while let Some(finished) = connections.try_join_next() {
                if let Err(e) = finished {
                    tracing::error!(error = %e, "connection task panicked");
                }
            }
        }

        self.listener.shutdown().await?;
        while let Some(finished) = connections.join_next().await {
            if let Err(e) = finished {
                tracing::error!(error = %e, "connection task panicked");
            }
        }
        tracing::info!("stub switch stopped");
        Ok(())
    }
}
