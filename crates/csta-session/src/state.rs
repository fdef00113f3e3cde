//! Client lifecycle states.

use std::fmt;

/// Where a client is in its lifecycle.
///
/// ```text
/// Disconnected → Connected → SessionNegotiating → SessionActive → Stopped
/// ```
///
/// A rejected session start returns to `Connected`; losing the connection
/// from any state ends in `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    Disconnected,
    Connected,
    SessionNegotiating,
    SessionActive,
    Stopped,
}

impl ClientState {
    /// Whether requests that need a session may be sent.
    pub fn has_session(self) -> bool {
        matches!(self, Self::SessionActive)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::SessionNegotiating => "session-negotiating",
            Self::SessionActive => "session-active",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
