//! Device resource registry for the csta stub switch.
//!
//! A single [`ResourceRegistry`] is shared by every server connection. It
//! maps a directory number to a [`Resource`] and hands each one out to at
//! most one requester at a time.
//!
//! # Key types
//!
//! - [`ResourceRegistry`]: add, allocate, and release resources
//! - [`Resource`] / [`ResourceKind`]: what is being handed out
//! - [`Allocation`] / [`Release`]: operation outcomes

mod error;
mod registry;
mod resource;

pub use error::RegistryError;
pub use registry::ResourceRegistry;
pub use resource::{Allocation, Release, Resource, ResourceKind};
