//! ECMA-354 application session messages.

use serde::{Deserialize, Serialize};

/// Opens an application session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartApplicationSession {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "applicationInfo")]
    pub application_info: ApplicationInfo,
    #[serde(rename = "requestedProtocolVersions")]
    pub requested_protocol_versions: ProtocolVersions,
    #[serde(rename = "requestedSessionDuration", default, skip_serializing_if = "Option::is_none")]
    pub requested_session_duration: Option<u32>,
}

impl StartApplicationSession {
    /// The requested version strings, in preference order.
    pub fn requested_versions(&self) -> &[String] {
        &self.requested_protocol_versions.versions
    }

    /// Login name from the Avaya login block, if present.
    pub fn user_name(&self) -> Option<&str> {
        self.application_info
            .application_specific_info
            .as_ref()
            .map(|info| info.session_login_info.user_name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    #[serde(rename = "applicationID")]
    pub application_id: String,
    #[serde(rename = "applicationSpecificInfo", default, skip_serializing_if = "Option::is_none")]
    pub application_specific_info: Option<ApplicationSpecificInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSpecificInfo {
    #[serde(rename = "SessionLoginInfo")]
    pub session_login_info: SessionLoginInfo,
}

/// Avaya credentials carried inside `applicationSpecificInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLoginInfo {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "password")]
    pub password: String,
    #[serde(rename = "sessionCleanupDelay", default, skip_serializing_if = "Option::is_none")]
    pub session_cleanup_delay: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtocolVersions {
    #[serde(rename = "protocolVersion", default)]
    pub versions: Vec<String>,
}

/// The server accepted the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartApplicationSessionPosResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "actualProtocolVersion")]
    pub actual_protocol_version: String,
    #[serde(rename = "actualSessionDuration", default, skip_serializing_if = "Option::is_none")]
    pub actual_session_duration: Option<u32>,
}

/// The server refused the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartApplicationSessionNegResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "errorCode")]
    pub error_code: SessionErrorCode,
}

impl StartApplicationSessionNegResponse {
    /// The defined error, e.g. `requestedProtocolVersionNotSupported`.
    pub fn defined_error(&self) -> Option<&str> {
        self.error_code.defined_error.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionErrorCode {
    #[serde(rename = "definedError", default, skip_serializing_if = "Option::is_none")]
    pub defined_error: Option<String>,
}

/// Ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopApplicationSession {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "sessionEndReason", default)]
    pub session_end_reason: SessionEndReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionEndReason {
    #[serde(rename = "appEndReason", default, skip_serializing_if = "Option::is_none")]
    pub app_end_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopApplicationSessionPosResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
}

/// Keep-alive: asks the server to restart the session's expiry timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetApplicationSessionTimer {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "requestedSessionDuration", default, skip_serializing_if = "Option::is_none")]
    pub requested_session_duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetApplicationSessionTimerPosResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "actualSessionDuration", default, skip_serializing_if = "Option::is_none")]
    pub actual_session_duration: Option<u32>,
}

/// Asks which monitors the session currently holds. The server answers with
/// [`GetMonitorListResponse`] and then reports the list in
/// [`GetMonitorListEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMonitorList {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMonitorListResponse {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMonitorListEvent {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "sessionID", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}
