//! Avaya device-id allocation.

use serde::{Deserialize, Serialize};

use super::DeviceId;

/// Requests the device id of a station on a switch identified by address
/// and/or name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDeviceId {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "switchName", default, skip_serializing_if = "Option::is_none")]
    pub switch_name: Option<String>,
    #[serde(rename = "switchIPInterface", default, skip_serializing_if = "Option::is_none")]
    pub switch_ip_interface: Option<String>,
    #[serde(rename = "extension")]
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDeviceIdResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "device")]
    pub device: DeviceId,
}

/// Requests a third-party device id (no media), keyed by switch name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetThirdPartyDeviceId {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "switchName", default, skip_serializing_if = "Option::is_none")]
    pub switch_name: Option<String>,
    #[serde(rename = "extension")]
    pub extension: String,
    #[serde(rename = "deviceInstance", default, skip_serializing_if = "Option::is_none")]
    pub device_instance: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetThirdPartyDeviceIdResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "device")]
    pub device: DeviceId,
}

/// Returns a previously obtained device id to the switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDeviceId {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "device")]
    pub device: DeviceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDeviceIdResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
}
