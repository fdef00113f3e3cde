//! Error types for the registry.

/// Errors from registry mutations.
///
/// Allocation outcomes are not errors; see [`crate::Allocation`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A resource with this directory number is already present.
    #[error("resource {0} already exists")]
    AlreadyExists(String),

    /// The directory number is empty.
    #[error("directory number must not be empty")]
    EmptyKey,
}
