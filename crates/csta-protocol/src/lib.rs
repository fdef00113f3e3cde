//! CSTA XML message model for csta.
//!
//! This crate defines what travels inside a frame:
//!
//! - **Messages** ([`CstaMessage`] and the types in [`messages`]): the
//!   typed session, system, device, monitoring, and call-control messages.
//! - **Codec** ([`Codec`] trait, [`XmlCodec`]): how those messages are
//!   turned into XML text and back.
//! - **Registry** ([`MessageRegistry`]): classifies an inbound payload by
//!   its root element and decodes it into the matching variant.
//! - **Adapters** ([`ClientAdapter`], [`ServerAdapter`], [`DmccAdapter`]):
//!   per-version message builders, chosen during session negotiation.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (CstaMessage) → Session (client / server)
//! ```
//!
//! The protocol layer knows nothing about sockets or invoke ids; it only
//! converts between text and typed messages.

mod adapter;
mod codec;
mod error;
mod message;
pub mod messages;
mod version;

pub use adapter::{
    APPLICATION_REQUEST, ClientAdapter, DmccAdapter, ProtocolAdapter, ServerAdapter,
    SessionRequest, VERSION_NOT_SUPPORTED, negotiate, session_rejected,
};
pub use codec::{Codec, XML_DECLARATION, XmlCodec, root_element_name};
pub use error::ProtocolError;
pub use message::{CstaMessage, MessageRegistry, UnmappedData, XmlMessage};
pub use messages::*;
pub use version::ProtocolVersion;
