//! Client session engine for csta.
//!
//! This crate drives the client side of a CSTA link:
//!
//! 1. **Requests**: invoke-id allocation, per-request user context
//!    ([`CstaClient::send`])
//! 2. **Events**: one read loop that classifies every inbound frame and
//!    fans it out to subscribers ([`CstaClient::run_event_loop`],
//!    [`CstaEvent`])
//! 3. **Waiting**: blocking on the reply to one request
//!    ([`CstaClient::wait_for`], [`WaitOutcome`])
//! 4. **Keep-alive**: periodic session-timer refresh ([`KeepAlive`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← subscribes to events, calls convenience requests
//!     ↕
//! Session Layer (this crate)  ← correlation, fan-out, session lifecycle
//!     ↕
//! Protocol / Transport (below)  ← CstaMessage, frames, connections
//! ```

mod client;
mod config;
mod error;
mod events;
mod keepalive;
mod pending;
mod state;

pub use client::CstaClient;
pub use config::ClientConfig;
pub use error::SessionError;
pub use events::{CstaEvent, UserContext, WaitOutcome};
pub use keepalive::{KeepAlive, KeepAliveSettings};
pub use state::ClientState;
