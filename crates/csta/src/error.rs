//! Unified error type for csta.

use csta_protocol::ProtocolError;
use csta_registry::RegistryError;
use csta_session::SessionError;
use csta_transport::{ConnectError, InvokeIdError, TransportError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` lift any sub-crate error into it.
#[derive(Debug, thiserror::Error)]
pub enum CstaError {
    /// Framing, send, receive, or accept failures.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Opening a client connection failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Encoding or decoding a message failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invoke id space exhausted.
    #[error(transparent)]
    InvokeId(#[from] InvokeIdError),

    /// A client engine operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A registry mutation was refused.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
