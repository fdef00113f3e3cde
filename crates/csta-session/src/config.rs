//! Client configuration.

use std::time::Duration;

use csta_protocol::ProtocolVersion;
use csta_transport::{DEFAULT_PORT, DEFAULT_TLS_PORT, TlsClientConfig};

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Settings for a [`CstaClient`](crate::CstaClient).
///
/// Start from [`ClientConfig::new`] and override what you need; the
/// client calls [`validated`](Self::validated) before using it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host of the CSTA server (AES).
    pub host: String,
    /// Port override. `None` picks 4721, or 4722 when `tls` is set.
    pub port: Option<u16>,
    /// TLS settings. `None` means plain TCP.
    pub tls: Option<TlsClientConfig>,
    /// Version requested at session start.
    pub protocol_version: ProtocolVersion,
    pub application_id: String,
    /// Requested application session duration, in seconds.
    pub session_duration: u32,
    /// Seconds the switch keeps the session after the link drops.
    pub cleanup_delay: u32,
    /// How often the session timer is refreshed.
    pub keep_alive_interval: Duration,
    /// Timeout used by the `*_and_wait` helpers.
    pub wait_timeout: Duration,
    /// Address of the call server the devices live on.
    pub call_server_address: String,
    /// Name of the call server (switch connection name).
    pub call_server_name: String,
    /// Most request contexts kept while waiting for replies.
    pub pending_capacity: usize,
    /// Events buffered per subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl ClientConfig {
    /// Shortest keep-alive interval accepted.
    pub const MIN_KEEP_ALIVE: Duration = Duration::from_secs(1);

    /// Defaults for a server at `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            tls: None,
            protocol_version: ProtocolVersion::default(),
            application_id: "csta-rs".to_string(),
            session_duration: 180,
            cleanup_delay: 60,
            keep_alive_interval: Duration::from_secs(55),
            wait_timeout: Duration::from_secs(5),
            call_server_address: String::new(),
            call_server_name: String::new(),
            pending_capacity: 1024,
            event_capacity: 256,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_tls(mut self, tls: TlsClientConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }

    /// Sets the switch the client's devices belong to.
    pub fn with_call_server(mut self, address: impl Into<String>, name: impl Into<String>) -> Self {
        self.call_server_address = address.into();
        self.call_server_name = name.into();
        self
    }

    /// The port actually dialed.
    pub fn effective_port(&self) -> u16 {
        match (self.port, self.tls.is_some()) {
            (Some(port), _) => port,
            (None, true) => DEFAULT_TLS_PORT,
            (None, false) => DEFAULT_PORT,
        }
    }

    /// Fixes values that cannot work: zero capacities and keep-alive
    /// intervals below [`Self::MIN_KEEP_ALIVE`].
    pub fn validated(mut self) -> Self {
        if self.keep_alive_interval < Self::MIN_KEEP_ALIVE {
            tracing::warn!(
                interval = ?self.keep_alive_interval,
                "keep-alive interval too short, clamping"
            );
            self.keep_alive_interval = Self::MIN_KEEP_ALIVE;
        }
        self.pending_capacity = self.pending_capacity.max(1);
        self.event_capacity = self.event_capacity.max(1);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("localhost")
    }
}
