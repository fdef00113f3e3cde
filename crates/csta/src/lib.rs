//! # csta
//!
//! CSTA phase III / DMCC over TCP and TLS: a client engine for talking to a
//! call server and a stub switch for testing against.
//!
//! The crates underneath are re-exported as modules:
//!
//! - [`transport`]: framing, invoke ids, TLS, connections
//! - [`protocol`]: the XML message model and version adapters
//! - [`session`]: the client engine ([`CstaClient`](session::CstaClient))
//! - [`registry`]: the stub switch's resource table
//!
//! This crate adds the server side on top: [`CstaServer`] accepts
//! connections, negotiates a protocol version per connection, and answers
//! device requests from a shared [`ResourceRegistry`](registry::ResourceRegistry).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use csta::prelude::*;
//!
//! # async fn run() -> Result<(), CstaError> {
//! let resources = Arc::new(ResourceRegistry::new());
//! resources.add_extension("1233", "S1", "10.0.0.1").await?;
//!
//! let server = CstaServer::builder()
//!     .bind("127.0.0.1:4721")
//!     .switch_name("S1")
//!     .switch_address("10.0.0.1")
//!     .resources(resources)
//!     .build()
//!     .await?;
//! tokio::spawn(server.run());
//!
//! let config = ClientConfig::new("127.0.0.1").with_call_server("10.0.0.1", "S1");
//! let client = CstaClient::connect(config).await?;
//! let timeout = std::time::Duration::from_secs(5);
//! client.start_session_and_wait("agent", "secret", timeout).await;
//! client.spawn_event_loop();
//!
//! if let WaitOutcome::Matched(response) = client.obtain_device_id("1233").await? {
//!     println!("got {}", response.device.value);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::CstaError;
pub use server::{
    CstaServer, CstaServerBuilder, DEFAULT_SESSION_DURATION, REGISTER_ID_BASE, ServerConfig,
};

pub use csta_protocol as protocol;
pub use csta_registry as registry;
pub use csta_session as session;
pub use csta_transport as transport;

/// Commonly used types for building a client or a stub switch.
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{CstaError, CstaServer, CstaServerBuilder, ServerConfig};
    pub use csta_protocol::{CstaMessage, DeviceId, MonitorKind, OperationError, ProtocolVersion};
    pub use csta_registry::{Allocation, ResourceRegistry};
    pub use csta_session::{ClientConfig, ClientState, CstaClient, CstaEvent, WaitOutcome};
    pub use csta_transport::{CertificatePolicy, TlsClientConfig, TlsServerConfig};
}
