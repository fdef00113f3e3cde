//! System status registration.

use serde::{Deserialize, Serialize};

/// Registers for system status, naming the switch in Avaya private data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegister {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "requestTypes", default, skip_serializing_if = "Option::is_none")]
    pub request_types: Option<RequestTypes>,
    #[serde(rename = "requestedStatusFilter", default, skip_serializing_if = "Option::is_none")]
    pub requested_status_filter: Option<StatusFilter>,
    #[serde(rename = "extensions", default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<SystemRegisterExtensions>,
}

impl SystemRegister {
    /// The switch the caller wants to register against.
    pub fn switch_name(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .map(|ext| ext.private_data.private.data.switch_name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestTypes {
    #[serde(rename = "systemStatus", default, skip_serializing_if = "Option::is_none")]
    pub system_status: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusFilter {
    #[serde(rename = "normal", default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<bool>,
    #[serde(rename = "disabled", default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegisterExtensions {
    #[serde(rename = "privateData")]
    pub private_data: SystemRegisterPrivateDataHolder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegisterPrivateDataHolder {
    #[serde(rename = "private")]
    pub private: SystemRegisterPrivate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegisterPrivate {
    #[serde(rename = "SystemRegisterPrivateData")]
    pub data: SystemRegisterPrivateData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegisterPrivateData {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "invertFilter", default, skip_serializing_if = "Option::is_none")]
    pub invert_filter: Option<bool>,
    #[serde(rename = "switchName")]
    pub switch_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegisterResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "sysStatRegisterID")]
    pub sys_stat_register_id: String,
    #[serde(rename = "actualStatusFilter", default, skip_serializing_if = "Option::is_none")]
    pub actual_status_filter: Option<StatusFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegisterCancel {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "sysStatRegisterID")]
    pub sys_stat_register_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegisterCancelResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
}

/// Asks for the current system status, naming the switch in Avaya private
/// data so the server reports on its link to that switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSystemStatus {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "sysStatRegisterID", default, skip_serializing_if = "Option::is_none")]
    pub sys_stat_register_id: Option<String>,
    #[serde(rename = "extensions", default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<RequestSystemStatusExtensions>,
}

impl RequestSystemStatus {
    /// The switch whose link status is requested.
    pub fn switch_name(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .map(|ext| ext.private_data.private.data.tlink_status.switch_name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSystemStatusExtensions {
    #[serde(rename = "privateData")]
    pub private_data: RequestSystemStatusPrivateDataHolder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSystemStatusPrivateDataHolder {
    #[serde(rename = "private")]
    pub private: RequestSystemStatusPrivate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSystemStatusPrivate {
    #[serde(rename = "RequestSystemStatusPrivateData")]
    pub data: RequestSystemStatusPrivateData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSystemStatusPrivateData {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "getTlinkStatus")]
    pub tlink_status: TlinkStatusRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlinkStatusRequest {
    #[serde(rename = "switchName")]
    pub switch_name: String,
}

/// `systemStatus` is `normal`, `disabled`, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSystemStatusResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "systemStatus", default, skip_serializing_if = "Option::is_none")]
    pub system_status: Option<String>,
}
