//! The client session engine.
//!
//! A [`CstaClient`] owns one connection. Requests go out through
//! [`send`](CstaClient::send), which allocates an invoke id and remembers
//! any caller context. A single event loop reads every inbound frame,
//! classifies it into a [`CstaMessage`], attaches the stored context, and
//! publishes a [`CstaEvent`] to all subscribers. Synchronous helpers such
//! as [`obtain_device_id`](CstaClient::obtain_device_id) subscribe, send,
//! and then wait for the event carrying their invoke id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use csta_protocol::{
    ClientAdapter, CstaMessage, DeviceId, DmccAdapter, GetDeviceIdResponse,
    GetMonitorListResponse, GetThirdPartyDeviceIdResponse, MessageRegistry, MonitorKind,
    ReleaseDeviceIdResponse, RequestSystemStatusResponse, RouteRegisterCancelResponse,
    RouteRegisterResponse, SessionRequest, SystemRegisterCancelResponse, SystemRegisterResponse,
    UnmappedData, XmlMessage,
};
use csta_transport::{
    CstaConnection, Frame, InvokeId, InvokeIdService, OverflowPolicy, TransportError,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::keepalive::{KeepAlive, KeepAliveSettings};
use crate::pending::PendingContexts;
use crate::{ClientConfig, ClientState, CstaEvent, SessionError, UserContext, WaitOutcome};

/// A CSTA client bound to one connection. Cheap to clone.
#[derive(Clone)]
pub struct CstaClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    conn: CstaConnection,
    adapter: Arc<dyn ClientAdapter>,
    registry: MessageRegistry,
    invoke_ids: InvokeIdService,
    pending: PendingContexts,
    events: broadcast::Sender<Arc<CstaEvent>>,
    state: watch::Sender<ClientState>,
    session_id: RwLock<Option<String>>,
    register_id: RwLock<Option<String>>,
    keep_alive: Mutex<Option<KeepAlive>>,
    loop_running: AtomicBool,
    /// Stops the event loop.
    shutdown: CancellationToken,
    /// Cancelled once the event loop has ended.
    loop_ended: CancellationToken,
}

impl CstaClient {
    /// Connects to the server described by `config`.
    pub async fn connect(config: ClientConfig) -> Result<Self, SessionError> {
        let config = config.validated();
        let conn = CstaConnection::open(
            &config.host,
            config.effective_port(),
            config.tls.as_ref(),
        )
        .await?;
        tracing::info!(
            conn_id = %conn.id(),
            host = %config.host,
            port = config.effective_port(),
            secure = conn.is_secure(),
            "connected to CSTA server"
        );
        let adapter = Arc::new(DmccAdapter::new(config.protocol_version));
        Ok(Self::from_connection(conn, config, adapter))
    }

    /// Builds a client over an existing connection.
    ///
    /// Invoke ids start at 1 and wrap after 9999.
    pub fn from_connection(
        conn: CstaConnection,
        config: ClientConfig,
        adapter: Arc<dyn ClientAdapter>,
    ) -> Self {
        Self::with_invoke_ids(conn, config, adapter, InvokeIdService::new(OverflowPolicy::Wrap))
    }

    /// Like [`from_connection`](Self::from_connection), but draws invoke ids
    /// from `invoke_ids`.
    pub fn with_invoke_ids(
        conn: CstaConnection,
        config: ClientConfig,
        adapter: Arc<dyn ClientAdapter>,
        invoke_ids: InvokeIdService,
    ) -> Self {
        let config = config.validated();
        let (events, _) = broadcast::channel(config.event_capacity);
        let (state, _) = watch::channel(ClientState::Connected);

        Self {
            inner: Arc::new(ClientInner {
                pending: PendingContexts::new(config.pending_capacity),
                config,
                conn,
                adapter,
                registry: MessageRegistry::default(),
                invoke_ids,
                events,
                state,
                session_id: RwLock::new(None),
                register_id: RwLock::new(None),
                keep_alive: Mutex::new(None),
                loop_running: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
                loop_ended: CancellationToken::new(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn connection(&self) -> &CstaConnection {
        &self.inner.conn
    }

    pub fn state(&self) -> ClientState {
        *self.inner.state.borrow()
    }

    /// Follows state changes.
    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.inner.state.subscribe()
    }

    /// The current application session id, once one is established.
    pub async fn session_id(&self) -> Option<String> {
        self.inner.session_id.read().await.clone()
    }

    /// The system status register id, once registered.
    pub async fn register_id(&self) -> Option<String> {
        self.inner.register_id.read().await.clone()
    }

    /// Receives every event published by the event loop from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<CstaEvent>> {
        self.inner.events.subscribe()
    }

    /// Number of live event subscribers, waiters included.
    pub fn subscriber_count(&self) -> usize {
        self.inner.events.receiver_count()
    }

    /// Settings of the running keep-alive, if any.
    pub async fn keep_alive_settings(&self) -> Option<KeepAliveSettings> {
        self.inner
            .keep_alive
            .lock()
            .await
            .as_ref()
            .map(KeepAlive::settings)
    }

    fn set_state(&self, state: ClientState) {
        let previous = self.inner.state.send_replace(state);
        if previous != state {
            tracing::debug!(
                conn_id = %self.inner.conn.id(),
                from = %previous,
                to = %state,
                "client state changed"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Sending and waiting
    // -----------------------------------------------------------------------

    /// Sends a request and returns its invoke id.
    ///
    /// `context` is attached to the first event that comes back under that
    /// id. Without one, any context left over from an earlier use of the
    /// same id is dropped. If the write fails the context is discarded.
    pub async fn send<T: XmlMessage>(
        &self,
        message: T,
        context: Option<UserContext>,
    ) -> Result<InvokeId, SessionError> {
        let invoke_id = self.inner.invoke_ids.next()?;
        let message = message.into_message();
        let payload = self.inner.registry.encode(&message)?;

        // A wrapped id may still carry an unanswered request's context.
        self.inner.pending.remove(invoke_id).await;
        if let Some(context) = context {
            self.inner.pending.insert(invoke_id, context).await;
        }

        if let Err(e) = self.inner.conn.send(&Frame::new(invoke_id, payload)).await {
            self.inner.pending.remove(invoke_id).await;
            tracing::warn!(
                conn_id = %self.inner.conn.id(),
                %invoke_id,
                kind = message.type_name(),
                error = %e,
                "send failed"
            );
            return Err(e.into());
        }

        tracing::debug!(
            conn_id = %self.inner.conn.id(),
            %invoke_id,
            kind = message.type_name(),
            "request sent"
        );
        Ok(invoke_id)
    }

    /// Waits for the event answering `invoke_id`.
    ///
    /// Only events published after this call are seen; to avoid missing a
    /// fast reply use [`send_and_wait`](Self::send_and_wait) instead.
    pub async fn wait_for<T: XmlMessage>(
        &self,
        invoke_id: InvokeId,
        timeout: Duration,
    ) -> WaitOutcome<T> {
        let rx = self.subscribe();
        self.wait_on(rx, invoke_id, timeout).await
    }

    /// Subscribes, sends, and waits for the reply.
    pub async fn send_and_wait<T: XmlMessage, R: XmlMessage>(
        &self,
        message: T,
        context: Option<UserContext>,
        timeout: Duration,
    ) -> Result<(InvokeId, WaitOutcome<R>), SessionError> {
        let rx = self.subscribe();
        let invoke_id = self.send(message, context).await?;
        let outcome = self.wait_on(rx, invoke_id, timeout).await;
        Ok((invoke_id, outcome))
    }

    async fn wait_on<T: XmlMessage>(
        &self,
        mut rx: broadcast::Receiver<Arc<CstaEvent>>,
        invoke_id: InvokeId,
        timeout: Duration,
    ) -> WaitOutcome<T> {
        let wait = async {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(event) if event.invoke_id == Some(invoke_id) => {
                            return WaitOutcome::from_message(&event.message);
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                %invoke_id,
                                skipped,
                                "waiter lagged behind the event stream"
                            );
                        }
                        Err(RecvError::Closed) => return WaitOutcome::Disconnected,
                    },
                    _ = self.inner.loop_ended.cancelled() => return WaitOutcome::Disconnected,
                }
            }
        };

        let outcome = tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or(WaitOutcome::TimedOut);
        self.inner.pending.remove(invoke_id).await;

        if matches!(outcome, WaitOutcome::TimedOut) {
            tracing::debug!(%invoke_id, ?timeout, "no reply before timeout");
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Application session
    // -----------------------------------------------------------------------

    /// Sends a session-start request.
    pub async fn start_session(
        &self,
        user: &str,
        password: &str,
    ) -> Result<InvokeId, SessionError> {
        let config = &self.inner.config;
        let request = self.inner.adapter.start_application_session(&SessionRequest {
            application_id: config.application_id.clone(),
            user_name: user.to_string(),
            password: password.to_string(),
            session_duration: config.session_duration,
            cleanup_delay: config.cleanup_delay,
        });
        self.set_state(ClientState::SessionNegotiating);
        let invoke_id = self.send(request, None).await;
        if invoke_id.is_err() {
            self.set_state(ClientState::Connected);
        }
        invoke_id
    }

    /// Starts a session and reads the reply directly off the connection.
    ///
    /// Only usable before the event loop runs, since it performs one read
    /// of its own. Returns `true` when the server accepted the session.
    pub async fn start_session_and_wait(
        &self,
        user: &str,
        password: &str,
        timeout: Duration,
    ) -> bool {
        if self.inner.loop_running.load(Ordering::Acquire) {
            tracing::warn!("start_session_and_wait called while the event loop is running");
            return false;
        }

        if let Err(e) = self.start_session(user, password).await {
            tracing::warn!(error = %e, "session start could not be sent");
            return false;
        }

        let frame = match tokio::time::timeout(timeout, self.inner.conn.recv()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                tracing::warn!("connection closed while waiting for session start");
                self.set_state(ClientState::Disconnected);
                return false;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "session start reply could not be read");
                self.set_state(ClientState::Connected);
                return false;
            }
            Err(_) => {
                tracing::warn!(?timeout, "no session start reply");
                self.set_state(ClientState::Connected);
                return false;
            }
        };

        match self.inner.registry.decode(&frame.payload) {
            CstaMessage::StartApplicationSessionPosResponse(response) => {
                self.session_established(response.session_id).await;
                true
            }
            CstaMessage::StartApplicationSessionNegResponse(response) => {
                tracing::warn!(reason = ?response.defined_error(), "session start rejected");
                self.set_state(ClientState::Connected);
                false
            }
            other => {
                tracing::warn!(kind = other.type_name(), "unexpected reply to session start");
                self.set_state(ClientState::Connected);
                false
            }
        }
    }

    async fn session_established(&self, session_id: String) {
        tracing::info!(
            conn_id = %self.inner.conn.id(),
            %session_id,
            "application session active"
        );
        *self.inner.session_id.write().await = Some(session_id.clone());
        self.set_state(ClientState::SessionActive);
        self.start_keep_alive(session_id).await;
    }

    async fn require_session(&self) -> Result<String, SessionError> {
        self.session_id().await.ok_or(SessionError::NoSession)
    }

    /// Ends the application session and stops the keep-alive.
    ///
    /// The event loop keeps running; call [`close`](Self::close) to end it.
    pub async fn stop_session(&self) -> Result<InvokeId, SessionError> {
        let session_id = self.require_session().await?;
        self.stop_keep_alive().await;
        let request = self.inner.adapter.stop_application_session(&session_id);
        self.send(request, None).await
    }

    /// Refreshes the session timer once.
    pub async fn reset_session_timer(&self) -> Result<InvokeId, SessionError> {
        let session_id = self.require_session().await?;
        let request = self
            .inner
            .adapter
            .reset_application_session_timer(&session_id, self.inner.config.session_duration);
        self.send(request, None).await
    }

    async fn start_keep_alive(&self, session_id: String) {
        let settings = KeepAliveSettings::new(session_id, self.inner.config.keep_alive_interval);
        let mut guard = self.inner.keep_alive.lock().await;
        if let Some(keep_alive) = guard.as_ref() {
            keep_alive.reconfigure(settings);
            return;
        }

        let client = Arc::downgrade(&self.inner);
        *guard = Some(KeepAlive::spawn(settings, move |session_id| {
            let client: Weak<ClientInner> = client.clone();
            async move {
                let inner = client.upgrade().ok_or(SessionError::Closed)?;
                let duration = inner.config.session_duration;
                let request = inner
                    .adapter
                    .reset_application_session_timer(&session_id, duration);
                CstaClient { inner }.send(request, None).await
            }
        }));
    }

    async fn stop_keep_alive(&self) {
        if let Some(keep_alive) = self.inner.keep_alive.lock().await.take() {
            keep_alive.stop();
            tracing::debug!(conn_id = %self.inner.conn.id(), "keep-alive stopped");
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Registers for system status on the configured call server.
    pub async fn system_register(&self) -> Result<InvokeId, SessionError> {
        let request = self
            .inner
            .adapter
            .system_register(&self.inner.config.call_server_name);
        self.send(request, None).await
    }

    /// Cancels the system status registration made by
    /// [`system_register`](Self::system_register).
    pub async fn system_register_cancel(&self) -> Result<InvokeId, SessionError> {
        let request = self.system_register_cancel_request().await?;
        self.send(request, None).await
    }

    /// Asks for the status of the configured call server. Needs a system
    /// status registration and a configured call server name.
    pub async fn request_system_status(&self) -> Result<InvokeId, SessionError> {
        let request = self.system_status_request().await?;
        self.send(request, None).await
    }

    /// Asks for the monitors held by the current session.
    pub async fn get_monitor_list(&self) -> Result<InvokeId, SessionError> {
        let session_id = self.require_session().await?;
        let request = self.inner.adapter.get_monitor_list(&session_id);
        self.send(request, None).await
    }

    /// Registers as the routing server for `device`.
    pub async fn route_register(&self, device: DeviceId) -> Result<InvokeId, SessionError> {
        let request = self.inner.adapter.route_register(device);
        self.send(request, None).await
    }

    pub async fn route_register_cancel(&self, request_id: &str) -> Result<InvokeId, SessionError> {
        let request = self.inner.adapter.route_register_cancel(request_id);
        self.send(request, None).await
    }

    /// Requests a device id for a station on the configured call server.
    pub async fn get_device_id(&self, extension: &str) -> Result<InvokeId, SessionError> {
        let config = &self.inner.config;
        let request = self.inner.adapter.get_device_id(
            extension,
            Some(config.call_server_address.as_str()).filter(|s| !s.is_empty()),
            Some(config.call_server_name.as_str()).filter(|s| !s.is_empty()),
        );
        self.send(request, None).await
    }

    pub async fn get_third_party_device_id(
        &self,
        extension: &str,
    ) -> Result<InvokeId, SessionError> {
        let request = self
            .inner
            .adapter
            .get_third_party_device_id(extension, &self.inner.config.call_server_name);
        self.send(request, None).await
    }

    pub async fn release_device_id(&self, device: DeviceId) -> Result<InvokeId, SessionError> {
        let request = self.inner.adapter.release_device_id(device);
        self.send(request, None).await
    }

    pub async fn monitor_start(
        &self,
        device: DeviceId,
        kind: MonitorKind,
    ) -> Result<InvokeId, SessionError> {
        let request = self.inner.adapter.monitor_start(device, kind);
        self.send(request, None).await
    }

    pub async fn monitor_stop(&self, cross_ref_id: &str) -> Result<InvokeId, SessionError> {
        let request = self.inner.adapter.monitor_stop(cross_ref_id);
        self.send(request, None).await
    }

    pub async fn make_call(
        &self,
        calling: DeviceId,
        called: DeviceId,
    ) -> Result<InvokeId, SessionError> {
        let request = self.inner.adapter.make_call(calling, called);
        self.send(request, None).await
    }

    pub async fn answer_call(
        &self,
        call_id: &str,
        device: DeviceId,
    ) -> Result<InvokeId, SessionError> {
        let request = self.inner.adapter.answer_call(call_id, device);
        self.send(request, None).await
    }

    /// Registers for system status and waits for the register id.
    pub async fn system_register_and_wait(
        &self,
    ) -> Result<WaitOutcome<SystemRegisterResponse>, SessionError> {
        let request = self
            .inner
            .adapter
            .system_register(&self.inner.config.call_server_name);
        let (_, outcome) = self
            .send_and_wait(request, None, self.inner.config.wait_timeout)
            .await?;
        Ok(outcome)
    }

    /// Cancels the status registration and waits for the confirmation.
    pub async fn system_register_cancel_and_wait(
        &self,
    ) -> Result<WaitOutcome<SystemRegisterCancelResponse>, SessionError> {
        let request = self.system_register_cancel_request().await?;
        let (_, outcome) = self
            .send_and_wait(request, None, self.inner.config.wait_timeout)
            .await?;
        if outcome.is_matched() {
            *self.inner.register_id.write().await = None;
        }
        Ok(outcome)
    }

    /// Requests the call server status and waits for it.
    pub async fn request_system_status_and_wait(
        &self,
    ) -> Result<WaitOutcome<RequestSystemStatusResponse>, SessionError> {
        let request = self.system_status_request().await?;
        let (_, outcome) = self
            .send_and_wait(request, None, self.inner.config.wait_timeout)
            .await?;
        Ok(outcome)
    }

    /// Asks for the monitor list and waits for the acknowledgement. The
    /// list itself arrives afterwards as `GetMonitorListEvent`s.
    pub async fn get_monitor_list_and_wait(
        &self,
    ) -> Result<WaitOutcome<GetMonitorListResponse>, SessionError> {
        let session_id = self.require_session().await?;
        let request = self.inner.adapter.get_monitor_list(&session_id);
        let (_, outcome) = self
            .send_and_wait(request, None, self.inner.config.wait_timeout)
            .await?;
        Ok(outcome)
    }

    /// Registers as the routing server for `device` and waits for the
    /// route register request id.
    pub async fn route_register_and_wait(
        &self,
        device: DeviceId,
    ) -> Result<WaitOutcome<RouteRegisterResponse>, SessionError> {
        let request = self.inner.adapter.route_register(device);
        let (_, outcome) = self
            .send_and_wait(request, None, self.inner.config.wait_timeout)
            .await?;
        Ok(outcome)
    }

    pub async fn route_register_cancel_and_wait(
        &self,
        request_id: &str,
    ) -> Result<WaitOutcome<RouteRegisterCancelResponse>, SessionError> {
        let request = self.inner.adapter.route_register_cancel(request_id);
        let (_, outcome) = self
            .send_and_wait(request, None, self.inner.config.wait_timeout)
            .await?;
        Ok(outcome)
    }

    async fn system_register_cancel_request(
        &self,
    ) -> Result<csta_protocol::SystemRegisterCancel, SessionError> {
        let register_id = self.register_id().await.ok_or(SessionError::NotRegistered)?;
        Ok(self.inner.adapter.system_register_cancel(&register_id))
    }

    async fn system_status_request(
        &self,
    ) -> Result<csta_protocol::RequestSystemStatus, SessionError> {
        let register_id = self.register_id().await.ok_or(SessionError::NotRegistered)?;
        let switch_name = &self.inner.config.call_server_name;
        if switch_name.is_empty() {
            return Err(SessionError::NoCallServer);
        }
        Ok(self
            .inner
            .adapter
            .request_system_status(Some(&register_id), switch_name))
    }

    /// Requests a device id and waits for it.
    pub async fn obtain_device_id(
        &self,
        extension: &str,
    ) -> Result<WaitOutcome<GetDeviceIdResponse>, SessionError> {
        let config = &self.inner.config;
        let request = self.inner.adapter.get_device_id(
            extension,
            Some(config.call_server_address.as_str()).filter(|s| !s.is_empty()),
            Some(config.call_server_name.as_str()).filter(|s| !s.is_empty()),
        );
        let (_, outcome) = self.send_and_wait(request, None, config.wait_timeout).await?;
        Ok(outcome)
    }

    pub async fn obtain_third_party_device_id(
        &self,
        extension: &str,
    ) -> Result<WaitOutcome<GetThirdPartyDeviceIdResponse>, SessionError> {
        let request = self
            .inner
            .adapter
            .get_third_party_device_id(extension, &self.inner.config.call_server_name);
        let (_, outcome) = self
            .send_and_wait(request, None, self.inner.config.wait_timeout)
            .await?;
        Ok(outcome)
    }

    pub async fn release_device_and_wait(
        &self,
        device: DeviceId,
    ) -> Result<WaitOutcome<ReleaseDeviceIdResponse>, SessionError> {
        let request = self.inner.adapter.release_device_id(device);
        let (_, outcome) = self
            .send_and_wait(request, None, self.inner.config.wait_timeout)
            .await?;
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Reads and publishes inbound messages until stopped or disconnected.
    ///
    /// Returns immediately if another loop is already running.
    pub async fn run_event_loop(&self) {
        if self.inner.loop_running.swap(true, Ordering::AcqRel) {
            tracing::warn!(conn_id = %self.inner.conn.id(), "event loop already running");
            return;
        }
        let conn_id = self.inner.conn.id();
        tracing::debug!(%conn_id, "event loop started");

        loop {
            let received = tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                received = self.inner.conn.recv() => received,
            };

            match received {
                Ok(Some(frame)) => self.dispatch(frame).await,
                Ok(None) => {
                    tracing::info!(%conn_id, "server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        %conn_id,
                        error = %e,
                        "transport failure, ending event loop"
                    );
                    self.publish_transport_failure(&e);
                    break;
                }
            }
        }

        self.stop_keep_alive().await;
        if self.state() != ClientState::Stopped {
            self.set_state(ClientState::Disconnected);
        }
        self.inner.loop_running.store(false, Ordering::Release);
        self.inner.loop_ended.cancel();
        tracing::debug!(%conn_id, "event loop ended");
    }

    /// Runs the event loop on its own task.
    pub fn spawn_event_loop(&self) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move { client.run_event_loop().await })
    }

    /// Whether the event loop is currently running.
    pub fn is_event_loop_running(&self) -> bool {
        self.inner.loop_running.load(Ordering::Acquire)
    }

    async fn dispatch(&self, frame: Frame) {
        let invoke_id = frame.id();
        let message = self.inner.registry.decode(&frame.payload);
        tracing::debug!(
            conn_id = %self.inner.conn.id(),
            invoke_id = %frame.invoke_id,
            kind = message.type_name(),
            "message received"
        );

        self.observe(&message).await;

        let context = match invoke_id {
            Some(id) => self.inner.pending.take(id).await,
            None => None,
        };
        self.publish(CstaEvent {
            invoke_id,
            message,
            context,
        });
    }

    /// Session bookkeeping driven by inbound messages.
    async fn observe(&self, message: &CstaMessage) {
        match message {
            CstaMessage::StartApplicationSessionPosResponse(response) => {
                self.session_established(response.session_id.clone()).await;
            }
            CstaMessage::StartApplicationSessionNegResponse(response) => {
                tracing::warn!(reason = ?response.defined_error(), "session start rejected");
                self.set_state(ClientState::Connected);
            }
            CstaMessage::StopApplicationSessionPosResponse(_) => {
                self.stop_keep_alive().await;
                *self.inner.session_id.write().await = None;
                self.set_state(ClientState::Stopped);
            }
            CstaMessage::SystemRegisterResponse(response) => {
                let register_id = response.sys_stat_register_id.clone();
                tracing::info!(%register_id, "system status registered");
                *self.inner.register_id.write().await = Some(register_id);
            }
            _ => {}
        }
    }

    fn publish(&self, event: CstaEvent) {
        if self.inner.events.send(Arc::new(event)).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
    }

    fn publish_transport_failure(&self, error: &TransportError) {
        self.publish(CstaEvent {
            invoke_id: None,
            message: CstaMessage::Unmapped(UnmappedData {
                root: None,
                data: format!("transport failure: {error}"),
            }),
            context: None,
        });
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Stops the keep-alive and the event loop, then closes the connection.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.stop_keep_alive().await;
        self.inner.shutdown.cancel();
        self.inner.conn.close().await?;
        if !self.is_event_loop_running() {
            self.inner.loop_ended.cancel();
        }
        self.set_state(ClientState::Disconnected);
        Ok(())
    }
}

impl std::fmt::Debug for CstaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CstaClient")
            .field("conn", &self.inner.conn)
            .field("state", &self.state())
            .field("version", &self.inner.adapter.version())
            .finish()
    }
}
