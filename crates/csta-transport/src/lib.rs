//! Transport layer for CSTA over TCP.
//!
//! - [`Frame`] / [`FrameCodec`]: the 8-byte header + XML payload framing.
//! - [`InvokeId`] / [`InvokeIdService`]: the 4-digit correlation field.
//! - [`CstaConnection`]: a framed plain or TLS stream.
//! - [`CstaListener`] / [`Incoming`]: the server side, behind the
//!   [`Transport`] trait.

#![allow(async_fn_in_trait)]

mod connection;
mod error;
mod frame;
mod invoke;
mod listener;
pub mod tls;

pub use connection::{CstaConnection, DEFAULT_PORT, DEFAULT_TLS_PORT, Stream};
pub use error::{ConnectError, FrameError, InvokeIdError, TransportError};
pub use frame::{FRAME_VERSION, Frame, FrameCodec, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use invoke::{InvokeField, InvokeId, InvokeIdService, MAX_INVOKE_ID, OverflowPolicy};
pub use listener::{CstaListener, Incoming};
pub use tls::{CertificatePolicy, TlsClientConfig, TlsServerConfig, TlsSetupError};

use std::fmt;

/// Opaque identifier for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops accepting. Later calls to [`accept`](Self::accept) fail.
    async fn shutdown(&mut self) -> Result<(), Self::Error>;
}
