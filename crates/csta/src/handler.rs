//! Per-connection handler: session negotiation and request dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Wait for `StartApplicationSession` → negotiate a version
//!   2. Reply positively (or negatively and keep waiting)
//!   3. Loop: receive requests → answer from the resource registry
//!   4. On exit, release every device this connection still holds

use std::sync::Arc;

use csta_protocol::{
    CstaMessage, DeviceId, GetDeviceId, GetThirdPartyDeviceId, OperationError, ReleaseDeviceId,
    RequestSystemStatus, ServerAdapter, StartApplicationSession, SystemRegister,
    VERSION_NOT_SUPPORTED, negotiate, session_rejected,
};
use csta_registry::{Allocation, Release, Resource, ResourceKind};
use csta_transport::{ConnectionId, CstaConnection, Frame, Incoming};
use tokio_util::sync::CancellationToken;

use crate::CstaError;
use crate::server::{DEFAULT_SESSION_DURATION, ServerState};

/// `systemStatus` reported for the configured switch.
const SYSTEM_STATUS_NORMAL: &str = "normal";

/// Where a server-side session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Accepted,
    AwaitingSessionStart,
    Active,
}

/// The dispatch state of one connection.
pub(crate) struct ServerSession {
    state: Arc<ServerState>,
    conn_id: ConnectionId,
    phase: Phase,
    adapter: Option<Arc<dyn ServerAdapter>>,
    session_id: Option<String>,
    stopping: bool,
}

impl ServerSession {
    pub(crate) fn new(state: Arc<ServerState>, conn_id: ConnectionId) -> Self {
        Self {
            state,
            conn_id,
            phase: Phase::Accepted,
            adapter: None,
            session_id: None,
            stopping: false,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the client asked to end the session.
    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// Handles one inbound message and returns the reply, if any.
    pub(crate) async fn dispatch(&mut self, message: CstaMessage) -> Option<CstaMessage> {
        if self.phase == Phase::Accepted {
            self.phase = Phase::AwaitingSessionStart;
        }

        let Some(adapter) = self.bound_adapter() else {
            return self.start_session(message);
        };

        match message {
            CstaMessage::SystemRegister(request) => {
                Some(self.system_register(adapter.as_ref(), &request))
            }
            CstaMessage::SystemRegisterCancel(_) => {
                Some(adapter.system_register_cancelled().into())
            }
            CstaMessage::RequestSystemStatus(request) => {
                Some(self.system_status(adapter.as_ref(), &request))
            }
            CstaMessage::GetDeviceId(request) => {
                Some(self.get_device_id(adapter.as_ref(), &request).await)
            }
            CstaMessage::GetThirdPartyDeviceId(request) => {
                Some(self.get_third_party_device_id(adapter.as_ref(), &request).await)
            }
            CstaMessage::ReleaseDeviceId(request) => {
                Some(self.release_device_id(adapter.as_ref(), &request).await)
            }
            CstaMessage::ResetApplicationSessionTimer(request) => {
                tracing::debug!(conn_id = %self.conn_id, "session timer reset");
                Some(adapter.session_timer_reset(request.requested_session_duration).into())
            }
            CstaMessage::StopApplicationSession(request) => {
                tracing::info!(
                    conn_id = %self.conn_id,
                    session_id = ?self.session_id,
                    reason = ?request.session_end_reason.app_end_reason,
                    "session stopped by client"
                );
                self.stopping = true;
                Some(adapter.session_stopped().into())
            }
            CstaMessage::StartApplicationSession(_) => {
                tracing::debug!(conn_id = %self.conn_id, "session already active");
                Some(adapter.failure(OperationError::RequestIncompatibleWithObject).into())
            }
            other => {
                tracing::debug!(
                    conn_id = %self.conn_id,
                    kind = other.type_name(),
                    "ignoring unhandled message"
                );
                None
            }
        }
    }

    fn bound_adapter(&self) -> Option<Arc<dyn ServerAdapter>> {
        match self.phase {
            Phase::Active => self.adapter.clone(),
            _ => None,
        }
    }

    fn start_session(&mut self, message: CstaMessage) -> Option<CstaMessage> {
        let CstaMessage::StartApplicationSession(request) = message else {
            tracing::debug!(
                conn_id = %self.conn_id,
                kind = message.type_name(),
                "ignoring message before session start"
            );
            return None;
        };

        match negotiate(request.requested_versions(), &self.state.adapters) {
            Some(adapter) => Some(self.accept_session(adapter, &request)),
            None => {
                tracing::warn!(
                    conn_id = %self.conn_id,
                    requested = ?request.requested_versions(),
                    "no supported protocol version requested"
                );
                Some(session_rejected(VERSION_NOT_SUPPORTED).into())
            }
        }
    }

    fn accept_session(
        &mut self,
        adapter: Arc<dyn ServerAdapter>,
        request: &StartApplicationSession,
    ) -> CstaMessage {
        let session_id = self.state.next_session_id();
        let duration = request
            .requested_session_duration
            .unwrap_or(DEFAULT_SESSION_DURATION);
        let response = adapter.session_accepted(&session_id, duration);

        tracing::info!(
            conn_id = %self.conn_id,
            %session_id,
            user = ?request.user_name(),
            version = %adapter.version(),
            duration,
            "session started"
        );
        self.phase = Phase::Active;
        self.adapter = Some(adapter);
        self.session_id = Some(session_id);
        response.into()
    }

    fn system_register(
        &self,
        adapter: &dyn ServerAdapter,
        request: &SystemRegister,
    ) -> CstaMessage {
        let config = &self.state.config;
        if request.switch_name() != Some(config.switch_name.as_str()) {
            tracing::debug!(
                conn_id = %self.conn_id,
                requested = ?request.switch_name(),
                "system register for another switch"
            );
            return adapter.failure(OperationError::Generic).into();
        }
        let register_id = self.state.next_register_id();
        tracing::debug!(conn_id = %self.conn_id, %register_id, "system registered");
        adapter.system_registered(&register_id).into()
    }

    /// The stub's link to its own switch is always up.
    fn system_status(
        &self,
        adapter: &dyn ServerAdapter,
        request: &RequestSystemStatus,
    ) -> CstaMessage {
        if request.switch_name() != Some(self.state.config.switch_name.as_str()) {
            tracing::debug!(
                conn_id = %self.conn_id,
                requested = ?request.switch_name(),
                "status request for another switch"
            );
            return adapter.failure(OperationError::Generic).into();
        }
        adapter.system_status(SYSTEM_STATUS_NORMAL).into()
    }

    async fn get_device_id(
        &self,
        adapter: &dyn ServerAdapter,
        request: &GetDeviceId,
    ) -> CstaMessage {
        let outcome = self
            .state
            .resources
            .allocate_for(
                self.conn_id.into_inner(),
                &request.extension,
                request.switch_ip_interface.as_deref(),
                request.switch_name.as_deref(),
            )
            .await;
        match self.granted(&request.extension, outcome) {
            Ok(device) => adapter.device_id(DeviceId::voice(device)).into(),
            Err(error) => adapter.failure(error).into(),
        }
    }

    async fn get_third_party_device_id(
        &self,
        adapter: &dyn ServerAdapter,
        request: &GetThirdPartyDeviceId,
    ) -> CstaMessage {
        let config = &self.state.config;
        let provision = config.auto_provision
            && self.state.resources.get(&request.extension).await.is_none();
        if provision {
            let resource = Resource::new(
                request.extension.as_str(),
                ResourceKind::Extension,
                config.switch_name.as_str(),
                config.switch_address.as_str(),
            );
            // A concurrent provisioner winning the race is fine.
            if self.state.resources.add(resource).await.is_ok() {
                tracing::info!(
                    conn_id = %self.conn_id,
                    dn = %request.extension,
                    "extension provisioned"
                );
            }
        }

        let outcome = self
            .state
            .resources
            .allocate_for(
                self.conn_id.into_inner(),
                &request.extension,
                None,
                request.switch_name.as_deref(),
            )
            .await;
        match self.granted(&request.extension, outcome) {
            Ok(device) => adapter.third_party_device_id(DeviceId::plain(device)).into(),
            Err(error) => adapter.failure(error).into(),
        }
    }

    /// Maps an allocation outcome to a device id or the failure to send.
    fn granted(&self, extension: &str, outcome: Allocation) -> Result<String, OperationError> {
        match outcome {
            Allocation::Granted(device) => Ok(device),
            Allocation::NotFound | Allocation::SwitchMismatch => {
                tracing::debug!(
                    conn_id = %self.conn_id,
                    dn = extension,
                    ?outcome,
                    "device request refused"
                );
                Err(OperationError::InvalidDeviceId)
            }
            Allocation::AlreadyAllocated => {
                tracing::debug!(
                    conn_id = %self.conn_id,
                    dn = extension,
                    "device already allocated"
                );
                Err(OperationError::Generic)
            }
        }
    }

    async fn release_device_id(
        &self,
        adapter: &dyn ServerAdapter,
        request: &ReleaseDeviceId,
    ) -> CstaMessage {
        let device = request.device.value.as_str();
        match self.state.resources.release(device).await {
            Release::Released => adapter.device_released().into(),
            Release::NotFound => {
                tracing::debug!(conn_id = %self.conn_id, device, "release of unknown device");
                adapter.failure(OperationError::InvalidDeviceId).into()
            }
        }
    }

    /// Releases every device this connection still owns.
    ///
    /// Ownership lives in the registry, so a device that another session
    /// released and re-acquired is left alone.
    pub(crate) async fn release_all(&self) {
        let freed = self
            .state
            .resources
            .release_owned_by(self.conn_id.into_inner())
            .await;
        for device in freed {
            tracing::debug!(conn_id = %self.conn_id, %device, "device released on disconnect");
        }
    }
}

/// Handles a single connection from accept to close.
///
/// The TLS handshake runs here, on the connection's own task. Shutdown
/// during the handshake abandons the connection.
pub(crate) async fn handle_connection(
    incoming: Incoming,
    state: Arc<ServerState>,
    stop: CancellationToken,
) -> Result<(), CstaError> {
    let conn = tokio::select! {
        _ = stop.cancelled() => return Ok(()),
        conn = incoming.establish() => conn?,
    };
    let conn_id = conn.id();
    tracing::debug!(
        %conn_id,
        peer = ?conn.peer_addr(),
        secure = conn.is_secure(),
        "handling new connection"
    );

    let mut session = ServerSession::new(Arc::clone(&state), conn_id);
    let result = serve(&conn, &state, &mut session, &stop).await;

    if state.config.release_on_disconnect {
        session.release_all().await;
    }
    conn.close().await?;
    tracing::debug!(%conn_id, phase = ?session.phase(), "connection finished");
    result
}

async fn serve(
    conn: &CstaConnection,
    state: &ServerState,
    session: &mut ServerSession,
    stop: &CancellationToken,
) -> Result<(), CstaError> {
    let conn_id = conn.id();

    loop {
        let received = tokio::select! {
            _ = stop.cancelled() => {
                tracing::debug!(%conn_id, "server shutting down");
                return Ok(());
            }
            received = conn.recv() => received?,
        };
        let Some(frame) = received else {
            tracing::info!(%conn_id, "client closed the connection");
            return Ok(());
        };

        let message = state.messages.decode(&frame.payload);
        tracing::debug!(
            %conn_id,
            invoke_id = %frame.invoke_id,
            kind = message.type_name(),
            "request received"
        );

        if let Some(reply) = session.dispatch(message).await {
            let payload = state.messages.encode(&reply)?;
            conn.send(&Frame::new(frame.invoke_id, payload)).await?;
        }

        if session.is_stopping() {
            return Ok(());
        }
    }
}
