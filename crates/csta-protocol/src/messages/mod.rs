//! Typed CSTA/DMCC messages.
//!
//! Each struct serializes to one XML document whose root element is the
//! struct's name (or its `serde(rename)`). Elements a message may carry but
//! this crate does not model are ignored when decoding.

mod call;
mod device;
mod failure;
mod session;
mod system;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use call::*;
pub use device::*;
pub use failure::*;
pub use session::*;
pub use system::*;

/// ECMA-354 application session services.
pub const APPL_SESSION_NS: &str =
    "http://www.ecma-international.org/standards/ecma-354/appl_session";

/// ECMA-323 edition 3 CSTA services and events.
pub const CSTA_ED3_NS: &str =
    "http://www.ecma-international.org/standards/ecma-323/csta/ed3";

/// Avaya DMCC private services.
pub const AVAYA_NS: &str = "http://www.avaya.com/csta";

/// A switch-assigned device identifier.
///
/// Serialized as element text with optional descriptive attributes:
///
/// ```xml
/// <device typeOfNumber="other" mediaClass="voice" bitRate="constant">1233:S1:10.0.0.1:0</device>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DeviceId {
    /// Numbering plan hint.
    #[serde(rename = "@typeOfNumber", default, skip_serializing_if = "Option::is_none")]
    pub type_of_number: Option<String>,
    /// Media class hint.
    #[serde(rename = "@mediaClass", default, skip_serializing_if = "Option::is_none")]
    pub media_class: Option<String>,
    /// Bit rate hint.
    #[serde(rename = "@bitRate", default, skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<String>,
    /// The opaque identifier.
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl DeviceId {
    /// A voice device id with the attributes DMCC servers emit.
    pub fn voice(value: impl Into<String>) -> Self {
        Self {
            type_of_number: Some("other".into()),
            media_class: Some("voice".into()),
            bit_rate: Some("constant".into()),
            value: value.into(),
        }
    }

    /// A bare id with no attributes.
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A call/device pair identifying one party's leg of a call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionRef {
    /// Switch call identifier.
    #[serde(rename = "callID", default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Device on this leg.
    #[serde(rename = "deviceID", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
}
