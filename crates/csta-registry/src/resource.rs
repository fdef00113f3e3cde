//! Resources and the outcomes of allocating them.

use std::fmt;

// ---------------------------------------------------------------------------
// ResourceKind
// ---------------------------------------------------------------------------

/// What a directory number stands for on the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceKind {
    /// A station on the switch.
    Extension,
    /// A number outside the switch.
    External,
    /// A vector directory number (routing point).
    Vdn,
    #[default]
    Unknown,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extension => "extension",
            Self::External => "external",
            Self::Vdn => "vdn",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A device the switch hands out, keyed by directory number.
///
/// `allocated` is true between a granted allocation and its release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub directory_number: String,
    pub kind: ResourceKind,
    /// Opaque switch-assigned device identifier.
    pub device: String,
    pub switch_address: String,
    pub switch_name: String,
    pub allocated: bool,
    /// Who holds the current allocation, when it was made with an owner.
    pub owner: Option<u64>,
}

impl Resource {
    /// A free resource whose device id follows the
    /// `{dn}:{switchName}:{switchAddress}:0` convention.
    pub fn new(
        directory_number: impl Into<String>,
        kind: ResourceKind,
        switch_name: impl Into<String>,
        switch_address: impl Into<String>,
    ) -> Self {
        let directory_number = directory_number.into();
        let switch_name = switch_name.into();
        let switch_address = switch_address.into();
        let device = format!("{directory_number}:{switch_name}:{switch_address}:0");
        Self {
            directory_number,
            kind,
            device,
            switch_address,
            switch_name,
            allocated: false,
            owner: None,
        }
    }

    /// Whether a requester on the given switch may take this resource.
    ///
    /// Either identifier matching is enough; absent identifiers never match.
    pub fn managed_by(&self, switch_address: Option<&str>, switch_name: Option<&str>) -> bool {
        switch_address.is_some_and(|address| address == self.switch_address)
            || switch_name.is_some_and(|name| name == self.switch_name)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of [`crate::ResourceRegistry::allocate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// The resource is now allocated; carries its device id.
    Granted(String),
    AlreadyAllocated,
    NotFound,
    /// The resource exists but belongs to another switch.
    SwitchMismatch,
}

impl Allocation {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Result of [`crate::ResourceRegistry::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Released,
    NotFound,
}
