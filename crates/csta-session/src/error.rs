//! Error types for the client engine.

use csta_protocol::ProtocolError;
use csta_transport::{ConnectError, InvokeIdError, TransportError};

/// Errors surfaced by [`CstaClient`](crate::CstaClient) operations.
///
/// Negative replies from the switch are not errors; they arrive as
/// [`WaitOutcome::Failed`](crate::WaitOutcome::Failed) or as events.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    InvokeId(#[from] InvokeIdError),

    /// The operation needs an established application session.
    #[error("no application session is active")]
    NoSession,

    /// The operation needs a system status registration.
    #[error("not registered for system status")]
    NotRegistered,

    /// The operation needs `call_server_name` to be configured.
    #[error("no call server name configured")]
    NoCallServer,

    /// The client has been dropped or closed.
    #[error("client is closed")]
    Closed,
}
