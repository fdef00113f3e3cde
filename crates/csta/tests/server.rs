//! Integration tests for the stub switch: a real listener on loopback,
//! driven by the client engine or by a raw connection.

use std::time::Duration;

use csta::prelude::*;
use csta::protocol::{
    ClientAdapter, DmccAdapter, MessageRegistry, SessionRequest, StartApplicationSessionNegResponse,
    StartApplicationSessionPosResponse, VERSION_NOT_SUPPORTED, XmlCodec, XmlMessage,
};
use csta::transport::{CstaConnection, Frame, InvokeId};
use tokio::net::TcpStream;

const CA_PEM: &[u8] = include_bytes!("../../csta-transport/tests/fixtures/ca.pem");
const SERVER_PEM: &[u8] = include_bytes!("../../csta-transport/tests/fixtures/server.pem");
const SERVER_KEY: &[u8] = include_bytes!("../../csta-transport/tests/fixtures/server.key");

// =========================================================================
// Helpers
// =========================================================================

/// Starts a stub switch on a random port with extension 1233 on switch S1.
async fn start_server() -> (u16, Arc<ResourceRegistry>) {
    let resources = Arc::new(ResourceRegistry::new());
    resources
        .add_extension("1233", "S1", "10.0.0.1")
        .await
        .expect("seed extension");

    let server = CstaServer::builder()
        .bind("127.0.0.1:0")
        .switch_name("S1")
        .switch_address("10.0.0.1")
        .resources(Arc::clone(&resources))
        .build()
        .await
        .expect("server should build");

    let port = server.local_addr().expect("should have local addr").port();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (port, resources)
}

/// A client with an active session and a running event loop.
async fn connect(port: u16) -> CstaClient {
    let mut config = ClientConfig::new("127.0.0.1")
        .with_port(port)
        .with_call_server("10.0.0.1", "S1");
    config.wait_timeout = Duration::from_secs(2);

    let client = CstaClient::connect(config).await.expect("should connect");
    assert!(
        client
            .start_session_and_wait("agent", "secret", Duration::from_secs(2))
            .await
    );
    client.spawn_event_loop();
    client
}

async fn connect_raw(port: u16) -> CstaConnection {
    CstaConnection::open("127.0.0.1", port, None)
        .await
        .expect("should connect")
}

fn session_request(version: ProtocolVersion) -> CstaMessage {
    DmccAdapter::new(version)
        .start_application_session(&SessionRequest {
            application_id: "raw".into(),
            user_name: "agent".into(),
            password: "secret".into(),
            session_duration: 180,
            cleanup_delay: 60,
        })
        .into()
}

/// Sends one request on a raw connection and returns the reply.
async fn exchange(conn: &CstaConnection, invoke_id: u16, message: CstaMessage) -> CstaMessage {
    let messages = MessageRegistry::<XmlCodec>::default();
    let id = InvokeId::new(invoke_id).expect("valid invoke id");
    let payload = messages.encode(&message).expect("encode");
    conn.send(&Frame::new(id, payload)).await.expect("send");

    let reply = tokio::time::timeout(Duration::from_secs(2), conn.recv())
        .await
        .expect("reply in time")
        .expect("recv")
        .expect("connection open");
    assert_eq!(reply.id(), Some(id));
    messages.decode(&reply.payload)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_session_then_device_id() {
    let (port, _resources) = start_server().await;
    let client = connect(port).await;
    assert_eq!(client.state(), ClientState::SessionActive);
    assert!(client.session_id().await.is_some());

    let outcome = client.obtain_device_id("1233").await.expect("send");
    let response = outcome.matched().expect("device id granted");
    assert_eq!(response.device.value, "1233:S1:10.0.0.1:0");
}

#[tokio::test]
async fn test_unknown_extension_is_invalid_device() {
    let (port, _resources) = start_server().await;
    let client = connect(port).await;

    let outcome = client.obtain_device_id("4444").await.expect("send");
    match outcome {
        WaitOutcome::Failed(failure) => assert!(failure.is(OperationError::InvalidDeviceId)),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_allocate_conflict_release_and_reallocate() {
    let (port, resources) = start_server().await;
    let client = connect(port).await;

    let device = client
        .obtain_device_id("1233")
        .await
        .expect("send")
        .matched()
        .expect("first request granted")
        .device;
    assert!(resources.is_allocated("1233").await);

    match client.obtain_device_id("1233").await.expect("send") {
        WaitOutcome::Failed(failure) => assert!(failure.is(OperationError::Generic)),
        other => panic!("expected Failed, got {other:?}"),
    }

    let released = client.release_device_and_wait(device).await.expect("send");
    assert!(released.is_matched());
    assert!(!resources.is_allocated("1233").await);

    let again = client.obtain_device_id("1233").await.expect("send");
    assert!(again.is_matched());
}

#[tokio::test]
async fn test_version_mismatch_then_retry_on_same_connection() {
    let (port, _resources) = start_server().await;
    let conn = connect_raw(port).await;

    let reply = exchange(&conn, 1, session_request(ProtocolVersion::V70)).await;
    let rejected = StartApplicationSessionNegResponse::from_message(&reply)
        .unwrap_or_else(|| panic!("expected NegResponse, got {reply:?}"));
    assert_eq!(rejected.defined_error(), Some(VERSION_NOT_SUPPORTED));

    let reply = exchange(&conn, 2, session_request(ProtocolVersion::V63)).await;
    let accepted = StartApplicationSessionPosResponse::from_message(&reply)
        .unwrap_or_else(|| panic!("expected PosResponse, got {reply:?}"));
    assert_eq!(accepted.actual_protocol_version, ProtocolVersion::V63.wire_string());
    assert_eq!(accepted.actual_session_duration, Some(180));
}

#[tokio::test]
async fn test_system_register_returns_register_id() {
    let (port, _resources) = start_server().await;
    let client = connect(port).await;

    let outcome = client.system_register_and_wait().await.expect("send");
    let response = outcome.matched().expect("registered");
    assert_eq!(response.sys_stat_register_id, "50001");
    assert_eq!(client.register_id().await.as_deref(), Some("50001"));
}

#[tokio::test]
async fn test_disconnect_releases_devices() {
    let (port, resources) = start_server().await;

    let first = connect(port).await;
    assert!(first.obtain_device_id("1233").await.expect("send").is_matched());
    first.close().await.expect("close");

    // The server releases once it notices the hang-up.
    let mut freed = false;
    for _ in 0..100 {
        if !resources.is_allocated("1233").await {
            freed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(freed, "device still allocated after disconnect");

    let second = connect(port).await;
    assert!(second.obtain_device_id("1233").await.expect("send").is_matched());
}

#[tokio::test]
async fn test_stop_session_closes_connection() {
    let (port, _resources) = start_server().await;
    let conn = connect_raw(port).await;

    let reply = exchange(&conn, 1, session_request(ProtocolVersion::V63)).await;
    let session_id = StartApplicationSessionPosResponse::from_message(&reply)
        .expect("session accepted")
        .session_id
        .clone();

    let stop = DmccAdapter::default().stop_application_session(&session_id);
    let reply = exchange(&conn, 2, stop.into()).await;
    assert!(matches!(reply, CstaMessage::StopApplicationSessionPosResponse(_)));

    let next = tokio::time::timeout(Duration::from_secs(2), conn.recv())
        .await
        .expect("server should close");
    assert!(matches!(next, Ok(None) | Err(_)));
}

#[tokio::test]
async fn test_requests_before_session_get_no_reply() {
    let (port, resources) = start_server().await;
    let conn = connect_raw(port).await;

    let request = DmccAdapter::default().get_device_id("1233", Some("10.0.0.1"), None);
    let payload = MessageRegistry::<XmlCodec>::default()
        .encode(&request.into())
        .expect("encode");
    conn.send(&Frame::new(InvokeId::new(1).expect("valid"), payload))
        .await
        .expect("send");

    let reply = tokio::time::timeout(Duration::from_millis(200), conn.recv()).await;
    assert!(reply.is_err(), "expected no reply, got {reply:?}");
    assert!(!resources.is_allocated("1233").await);
}

#[tokio::test]
async fn test_shutdown_token_stops_server() {
    let server = CstaServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let port = server.local_addr().expect("local addr").port();
    let shutdown = server.shutdown_token();
    let running = tokio::spawn(server.run());

    let conn = connect_raw(port).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("run should return")
        .expect("task should not panic");
    assert!(result.is_ok());

    let closed = tokio::time::timeout(Duration::from_secs(2), conn.recv())
        .await
        .expect("connection should close");
    assert!(matches!(closed, Ok(None) | Err(_)));
}

#[tokio::test]
async fn test_system_status_after_register() {
    let (port, _resources) = start_server().await;
    let client = connect(port).await;
    assert!(client.system_register_and_wait().await.expect("send").is_matched());

    let outcome = client.request_system_status_and_wait().await.expect("send");
    let response = outcome.matched().expect("status reported");
    assert_eq!(response.system_status.as_deref(), Some("normal"));
}

#[tokio::test]
async fn test_stalled_tls_client_does_not_block_other_sessions() {
    let server = CstaServer::builder()
        .bind("127.0.0.1:0")
        .switch_name("S1")
        .switch_address("10.0.0.1")
        .tls(TlsServerConfig {
            cert: SERVER_PEM.to_vec(),
            key: SERVER_KEY.to_vec(),
        })
        .build()
        .await
        .expect("server should build");
    let port = server.local_addr().expect("local addr").port();
    let shutdown = server.shutdown_token();
    tokio::spawn(server.run());

    // Connects but never starts the handshake.
    let _silent = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("should connect");

    let mut config = ClientConfig::new("localhost")
        .with_port(port)
        .with_tls(TlsClientConfig {
            ca_certs: Some(CA_PEM.to_vec()),
            policy: CertificatePolicy::Verify,
        })
        .with_call_server("10.0.0.1", "S1");
    config.wait_timeout = Duration::from_secs(2);

    let started = tokio::time::timeout(Duration::from_secs(3), async {
        let client = CstaClient::connect(config).await.expect("should connect");
        client
            .start_session_and_wait("agent", "secret", Duration::from_secs(2))
            .await
    })
    .await
    .expect("session should start while another handshake is pending");
    assert!(started);

    shutdown.cancel();
}
