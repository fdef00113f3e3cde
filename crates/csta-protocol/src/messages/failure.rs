//! The CSTA universal failure (`CSTAErrorCode`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation-category error values used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationError {
    Generic,
    InvalidDeviceId,
    RequestIncompatibleWithObject,
    ObjectNotKnown,
    InvalidCrossRefId,
}

impl OperationError {
    /// Element text for this error.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::InvalidDeviceId => "invalidDeviceID",
            Self::RequestIncompatibleWithObject => "requestIncompatibleWithObject",
            Self::ObjectNotKnown => "objectNotKnown",
            Self::InvalidCrossRefId => "invalidCrossRefID",
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negative response to any CSTA request.
///
/// Exactly one category element is expected to be present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename = "CSTAErrorCode")]
pub struct UniversalFailure {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "operation", default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(rename = "security", default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    #[serde(rename = "stateIncompatibility", default, skip_serializing_if = "Option::is_none")]
    pub state_incompatibility: Option<String>,
    #[serde(
        rename = "systemResourceAvailability",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub system_resource_availability: Option<String>,
    #[serde(rename = "unspecified", default, skip_serializing_if = "Option::is_none")]
    pub unspecified: Option<String>,
}

impl UniversalFailure {
    /// An operation-category failure.
    pub fn operation(xmlns: impl Into<String>, error: OperationError) -> Self {
        Self {
            xmlns: xmlns.into(),
            operation: Some(error.as_str().to_string()),
            ..Self::default()
        }
    }

    /// The error value, whichever category carries it.
    pub fn code(&self) -> Option<&str> {
        [
            &self.operation,
            &self.security,
            &self.state_incompatibility,
            &self.system_resource_availability,
            &self.unspecified,
        ]
        .into_iter()
        .find_map(|value| value.as_deref())
    }

    /// Whether this is the given operation error.
    pub fn is(&self, error: OperationError) -> bool {
        self.operation.as_deref() == Some(error.as_str())
    }
}

impl fmt::Display for UniversalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code().unwrap_or("unspecified"))
    }
}
