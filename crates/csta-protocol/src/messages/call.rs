//! Monitoring, call control, routing, and call events.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ConnectionRef, DeviceId};

/// What a monitor watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    /// Events for the device itself.
    Device,
    /// Events for calls passing through the device.
    Call,
}

impl MonitorKind {
    /// The `monitorType` element text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Call => "call",
        }
    }
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStart {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "monitorObject")]
    pub monitor_object: MonitorObject,
    #[serde(rename = "monitorType", default, skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorObject {
    #[serde(rename = "deviceObject")]
    pub device_object: DeviceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStartResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "monitorCrossRefID")]
    pub monitor_cross_ref_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStop {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "monitorCrossRefID")]
    pub monitor_cross_ref_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStopResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeCall {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "callingDevice")]
    pub calling_device: DeviceId,
    #[serde(rename = "calledDirectoryNumber")]
    pub called_directory_number: DeviceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeCallResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "callingDevice", default)]
    pub calling_device: ConnectionRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCall {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "callToBeAnswered")]
    pub call_to_be_answered: ConnectionRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCallResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
}

/// Registers as the routing server for a device (typically a VDN).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRegister {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "routeingDevice", default, skip_serializing_if = "Option::is_none")]
    pub routeing_device: Option<DeviceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRegisterResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "routeRegisterReqID")]
    pub route_register_req_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRegisterCancel {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "routeRegisterReqID")]
    pub route_register_req_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRegisterCancelResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
}

// Call events share one shape: the monitor they belong to, the leg they
// concern (whose element name differs per event), and an optional cause.
macro_rules! call_events {
    ($($name:ident => $connection:literal),* $(,)?) => {
        $(
            #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
            pub struct $name {
                #[serde(rename = "@xmlns", default)]
                pub xmlns: String,
                #[serde(rename = "monitorCrossRefID", default)]
                pub monitor_cross_ref_id: String,
                #[serde(rename = $connection, default, skip_serializing_if = "Option::is_none")]
                pub connection: Option<ConnectionRef>,
                #[serde(rename = "cause", default, skip_serializing_if = "Option::is_none")]
                pub cause: Option<String>,
            }
        )*
    };
}

call_events! {
    OriginatedEvent => "originatedConnection",
    DeliveredEvent => "connection",
    EstablishedEvent => "establishedConnection",
    ConnectionClearedEvent => "droppedConnection",
    CallClearedEvent => "clearedCall",
    FailedEvent => "failedConnection",
    TransferedEvent => "primaryOldCall",
    ConferencedEvent => "primaryOldCall",
}
