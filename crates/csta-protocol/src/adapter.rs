//! Per-version message builders.
//!
//! A [`ClientAdapter`] shapes the requests a client sends; a
//! [`ServerAdapter`] shapes the replies a server sends. The binding is fixed
//! once a session's version is negotiated. [`DmccAdapter`] implements both
//! for the ed3 private-data family.

use std::sync::Arc;

use crate::messages::*;
use crate::ProtocolVersion;

/// `definedError` sent when no requested version is supported.
pub const VERSION_NOT_SUPPORTED: &str = "requestedProtocolVersionNotSupported";

/// `appEndReason` the client sends when it closes its session.
pub const APPLICATION_REQUEST: &str = "Application Request";

/// Parameters of a session-start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub application_id: String,
    pub user_name: String,
    pub password: String,
    pub session_duration: u32,
    pub cleanup_delay: u32,
}

/// Common to both sides of a negotiated binding.
pub trait ProtocolAdapter: Send + Sync + 'static {
    /// The version this adapter speaks.
    fn version(&self) -> ProtocolVersion;
}

/// Builds client requests.
pub trait ClientAdapter: ProtocolAdapter {
    fn start_application_session(&self, request: &SessionRequest) -> StartApplicationSession;
    fn stop_application_session(&self, session_id: &str) -> StopApplicationSession;
    fn reset_application_session_timer(
        &self,
        session_id: &str,
        duration: u32,
    ) -> ResetApplicationSessionTimer;
    fn get_monitor_list(&self, session_id: &str) -> GetMonitorList;
    fn system_register(&self, switch_name: &str) -> SystemRegister;
    fn system_register_cancel(&self, register_id: &str) -> SystemRegisterCancel;
    fn request_system_status(
        &self,
        register_id: Option<&str>,
        switch_name: &str,
    ) -> RequestSystemStatus;
    fn get_device_id(
        &self,
        extension: &str,
        switch_ip: Option<&str>,
        switch_name: Option<&str>,
    ) -> GetDeviceId;
    fn get_third_party_device_id(&self, extension: &str, switch_name: &str)
    -> GetThirdPartyDeviceId;
    fn release_device_id(&self, device: DeviceId) -> ReleaseDeviceId;
    fn monitor_start(&self, device: DeviceId, kind: MonitorKind) -> MonitorStart;
    fn monitor_stop(&self, cross_ref_id: &str) -> MonitorStop;
    fn make_call(&self, calling: DeviceId, called: DeviceId) -> MakeCall;
    fn answer_call(&self, call_id: &str, device: DeviceId) -> AnswerCall;
    fn route_register(&self, device: DeviceId) -> RouteRegister;
    fn route_register_cancel(&self, request_id: &str) -> RouteRegisterCancel;
}

/// Builds server replies.
pub trait ServerAdapter: ProtocolAdapter {
    fn session_accepted(&self, session_id: &str, duration: u32)
    -> StartApplicationSessionPosResponse;
    fn session_stopped(&self) -> StopApplicationSessionPosResponse;
    fn session_timer_reset(&self, duration: Option<u32>)
    -> ResetApplicationSessionTimerPosResponse;
    fn system_registered(&self, register_id: &str) -> SystemRegisterResponse;
    fn system_register_cancelled(&self) -> SystemRegisterCancelResponse;
    fn system_status(&self, status: &str) -> RequestSystemStatusResponse;
    fn device_id(&self, device: DeviceId) -> GetDeviceIdResponse;
    fn third_party_device_id(&self, device: DeviceId) -> GetThirdPartyDeviceIdResponse;
    fn device_released(&self) -> ReleaseDeviceIdResponse;
    fn failure(&self, error: OperationError) -> UniversalFailure;
}

/// Negative session-start reply. Sent before any adapter is bound, so it
/// does not depend on a version.
pub fn session_rejected(defined_error: &str) -> StartApplicationSessionNegResponse {
    StartApplicationSessionNegResponse {
        xmlns: APPL_SESSION_NS.to_string(),
        error_code: SessionErrorCode {
            defined_error: Some(defined_error.to_string()),
        },
    }
}

/// The DMCC ed3 adapter, usable for any version with the same schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmccAdapter {
    version: ProtocolVersion,
}

impl DmccAdapter {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }
}

impl Default for DmccAdapter {
    fn default() -> Self {
        Self::new(ProtocolVersion::V63)
    }
}

impl ProtocolAdapter for DmccAdapter {
    fn version(&self) -> ProtocolVersion {
        self.version
    }
}

impl ClientAdapter for DmccAdapter {
    fn start_application_session(&self, request: &SessionRequest) -> StartApplicationSession {
        StartApplicationSession {
            xmlns: APPL_SESSION_NS.to_string(),
            application_info: ApplicationInfo {
                application_id: request.application_id.clone(),
                application_specific_info: Some(ApplicationSpecificInfo {
                    session_login_info: SessionLoginInfo {
                        xmlns: AVAYA_NS.to_string(),
                        user_name: request.user_name.clone(),
                        password: request.password.clone(),
                        session_cleanup_delay: Some(request.cleanup_delay),
                    },
                }),
            },
            requested_protocol_versions: ProtocolVersions {
                versions: vec![self.version.wire_string()],
            },
            requested_session_duration: Some(request.session_duration),
        }
    }

    fn stop_application_session(&self, session_id: &str) -> StopApplicationSession {
        StopApplicationSession {
            xmlns: APPL_SESSION_NS.to_string(),
            session_id: session_id.to_string(),
            session_end_reason: SessionEndReason {
                app_end_reason: Some(APPLICATION_REQUEST.to_string()),
            },
        }
    }

    fn reset_application_session_timer(
        &self,
        session_id: &str,
        duration: u32,
    ) -> ResetApplicationSessionTimer {
        ResetApplicationSessionTimer {
            xmlns: APPL_SESSION_NS.to_string(),
            session_id: session_id.to_string(),
            requested_session_duration: Some(duration),
        }
    }

    fn get_monitor_list(&self, session_id: &str) -> GetMonitorList {
        GetMonitorList {
            xmlns: APPL_SESSION_NS.to_string(),
            session_id: session_id.to_string(),
        }
    }

    fn system_register(&self, switch_name: &str) -> SystemRegister {
        SystemRegister {
            xmlns: CSTA_ED3_NS.to_string(),
            request_types: Some(RequestTypes {
                system_status: Some(true),
            }),
            requested_status_filter: Some(StatusFilter {
                normal: Some(true),
                disabled: Some(true),
            }),
            extensions: Some(SystemRegisterExtensions {
                private_data: SystemRegisterPrivateDataHolder {
                    private: SystemRegisterPrivate {
                        data: SystemRegisterPrivateData {
                            xmlns: AVAYA_NS.to_string(),
                            invert_filter: Some(true),
                            switch_name: switch_name.to_string(),
                        },
                    },
                },
            }),
        }
    }

    fn system_register_cancel(&self, register_id: &str) -> SystemRegisterCancel {
        SystemRegisterCancel {
            xmlns: CSTA_ED3_NS.to_string(),
            sys_stat_register_id: register_id.to_string(),
        }
    }

    fn request_system_status(
        &self,
        register_id: Option<&str>,
        switch_name: &str,
    ) -> RequestSystemStatus {
        RequestSystemStatus {
            xmlns: CSTA_ED3_NS.to_string(),
            sys_stat_register_id: register_id.map(str::to_string),
            extensions: Some(RequestSystemStatusExtensions {
                private_data: RequestSystemStatusPrivateDataHolder {
                    private: RequestSystemStatusPrivate {
                        data: RequestSystemStatusPrivateData {
                            xmlns: AVAYA_NS.to_string(),
                            tlink_status: TlinkStatusRequest {
                                switch_name: switch_name.to_string(),
                            },
                        },
                    },
                },
            }),
        }
    }

    fn get_device_id(
        &self,
        extension: &str,
        switch_ip: Option<&str>,
        switch_name: Option<&str>,
    ) -> GetDeviceId {
        GetDeviceId {
            xmlns: AVAYA_NS.to_string(),
            switch_name: switch_name.map(str::to_string),
            switch_ip_interface: switch_ip.map(str::to_string),
            extension: extension.to_string(),
        }
    }

    fn get_third_party_device_id(
        &self,
        extension: &str,
        switch_name: &str,
    ) -> GetThirdPartyDeviceId {
        GetThirdPartyDeviceId {
            xmlns: AVAYA_NS.to_string(),
            switch_name: Some(switch_name.to_string()),
            extension: extension.to_string(),
            device_instance: Some(0),
        }
    }

    fn release_device_id(&self, device: DeviceId) -> ReleaseDeviceId {
        ReleaseDeviceId {
            xmlns: AVAYA_NS.to_string(),
            device,
        }
    }

    fn monitor_start(&self, device: DeviceId, kind: MonitorKind) -> MonitorStart {
        MonitorStart {
            xmlns: CSTA_ED3_NS.to_string(),
            monitor_object: MonitorObject {
                device_object: device,
            },
            monitor_type: Some(kind.as_str().to_string()),
        }
    }

    fn monitor_stop(&self, cross_ref_id: &str) -> MonitorStop {
        MonitorStop {
            xmlns: CSTA_ED3_NS.to_string(),
            monitor_cross_ref_id: cross_ref_id.to_string(),
        }
    }

    fn make_call(&self, calling: DeviceId, called: DeviceId) -> MakeCall {
        MakeCall {
            xmlns: CSTA_ED3_NS.to_string(),
            calling_device: calling,
            called_directory_number: called,
        }
    }

    fn answer_call(&self, call_id: &str, device: DeviceId) -> AnswerCall {
        AnswerCall {
            xmlns: CSTA_ED3_NS.to_string(),
            call_to_be_answered: ConnectionRef {
                call_id: Some(call_id.to_string()),
                device_id: Some(device),
            },
        }
    }

    fn route_register(&self, device: DeviceId) -> RouteRegister {
        RouteRegister {
            xmlns: CSTA_ED3_NS.to_string(),
            routeing_device: Some(device),
        }
    }

    fn route_register_cancel(&self, request_id: &str) -> RouteRegisterCancel {
        RouteRegisterCancel {
            xmlns: CSTA_ED3_NS.to_string(),
            route_register_req_id: request_id.to_string(),
        }
    }
}

impl ServerAdapter for DmccAdapter {
    fn session_accepted(
        &self,
        session_id: &str,
        duration: u32,
    ) -> StartApplicationSessionPosResponse {
        StartApplicationSessionPosResponse {
            xmlns: APPL_SESSION_NS.to_string(),
            session_id: session_id.to_string(),
            actual_protocol_version: self.version.wire_string(),
            actual_session_duration: Some(duration),
        }
    }

    fn session_stopped(&self) -> StopApplicationSessionPosResponse {
        StopApplicationSessionPosResponse {
            xmlns: APPL_SESSION_NS.to_string(),
        }
    }

    fn session_timer_reset(
        &self,
        duration: Option<u32>,
    ) -> ResetApplicationSessionTimerPosResponse {
        ResetApplicationSessionTimerPosResponse {
            xmlns: APPL_SESSION_NS.to_string(),
            actual_session_duration: duration,
        }
    }

    fn system_registered(&self, register_id: &str) -> SystemRegisterResponse {
        SystemRegisterResponse {
            xmlns: CSTA_ED3_NS.to_string(),
            sys_stat_register_id: register_id.to_string(),
            actual_status_filter: Some(StatusFilter {
                normal: Some(true),
                disabled: Some(true),
            }),
        }
    }

    fn system_register_cancelled(&self) -> SystemRegisterCancelResponse {
        SystemRegisterCancelResponse {
            xmlns: CSTA_ED3_NS.to_string(),
        }
    }

    fn system_status(&self, status: &str) -> RequestSystemStatusResponse {
        RequestSystemStatusResponse {
            xmlns: CSTA_ED3_NS.to_string(),
            system_status: Some(status.to_string()),
        }
    }

    fn device_id(&self, device: DeviceId) -> GetDeviceIdResponse {
        GetDeviceIdResponse {
            xmlns: AVAYA_NS.to_string(),
            device,
        }
    }

    fn third_party_device_id(&self, device: DeviceId) -> GetThirdPartyDeviceIdResponse {
        GetThirdPartyDeviceIdResponse {
            xmlns: AVAYA_NS.to_string(),
            device,
        }
    }

    fn device_released(&self) -> ReleaseDeviceIdResponse {
        ReleaseDeviceIdResponse {
            xmlns: AVAYA_NS.to_string(),
        }
    }

    fn failure(&self, error: OperationError) -> UniversalFailure {
        UniversalFailure::operation(CSTA_ED3_NS, error)
    }
}

/// Picks the first requested version found among `supported`.
///
/// Requested strings are tried in the client's order of preference.
pub fn negotiate<A: ProtocolAdapter + ?Sized>(
    requested: &[String],
    supported: &[Arc<A>],
) -> Option<Arc<A>> {
    requested.iter().find_map(|wire| {
        let version = ProtocolVersion::from_wire(wire)?;
        supported
            .iter()
            .find(|adapter| adapter.version() == version)
            .cloned()
    })
}
