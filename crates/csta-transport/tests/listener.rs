//! Loopback tests: a real listener and a real client socket.

use std::sync::Arc;
use std::time::Duration;

use csta_transport::{
    CertificatePolicy, ConnectError, CstaConnection, CstaListener, Frame, InvokeId,
    InvokeIdService, TlsClientConfig, TlsServerConfig, Transport,
};
use tokio::net::TcpStream;

const CA_PEM: &[u8] = include_bytes!("fixtures/ca.pem");
const SERVER_CERT_PEM: &[u8] = include_bytes!("fixtures/server.pem");
const SERVER_KEY_PEM: &[u8] = include_bytes!("fixtures/server.key");

async fn bound_listener() -> (CstaListener, u16) {
    let listener = CstaListener::bind("127.0.0.1:0", None)
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

/// A TLS listener presenting a certificate for `localhost` only.
async fn tls_listener() -> (CstaListener, u16) {
    let tls = TlsServerConfig {
        cert: SERVER_CERT_PEM.to_vec(),
        key: SERVER_KEY_PEM.to_vec(),
    };
    let listener = CstaListener::bind("127.0.0.1:0", Some(&tls))
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

fn client_tls(policy: CertificatePolicy) -> TlsClientConfig {
    TlsClientConfig {
        ca_certs: Some(CA_PEM.to_vec()),
        policy,
    }
}

/// Accepts one TLS connection and echoes a single frame back.
fn spawn_tls_echo(mut listener: CstaListener) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let incoming = listener.accept().await.expect("should accept");
        assert!(incoming.is_secure());
        let Ok(conn) = incoming.establish().await else {
            return;
        };
        assert!(conn.is_secure());
        if let Ok(Some(frame)) = conn.recv().await {
            let _ = conn.send(&frame).await;
        }
    })
}

async fn echo_once(client: &CstaConnection) -> Frame {
    let id = InvokeId::new(42).unwrap();
    client.send(&Frame::new(id, "<Ping/>")).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("echo in time")
        .unwrap()
        .expect("an echo")
}

#[tokio::test]
async fn test_listener_accept_and_echo_invoke_id() {
    let (mut listener, port) = bound_listener().await;

    let server = tokio::spawn(async move {
        let conn = listener
            .accept()
            .await
            .expect("should accept")
            .establish()
            .await
            .expect("plain connections need no handshake");
        assert!(!conn.is_secure());
        let request = conn.recv().await.unwrap().expect("a request");
        conn.send(&Frame::new(request.invoke_id, "<Reply/>"))
            .await
            .unwrap();
        request
    });

    let client = CstaConnection::open("127.0.0.1", port, None)
        .await
        .expect("client should connect");
    let ids = InvokeIdService::default();
    let id = ids.next().unwrap();
    client.send(&Frame::new(id, "<Request/>")).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("reply in time")
        .unwrap()
        .expect("a reply");
    assert_eq!(reply.id(), Some(id));
    assert_eq!(reply.payload, "<Reply/>");

    let request = server.await.unwrap();
    assert_eq!(request.payload, "<Request/>");
}

#[tokio::test]
async fn test_large_payload_crosses_socket_intact() {
    let (mut listener, port) = bound_listener().await;
    let payload = format!("<Big>{}</Big>", "z".repeat(60_000));
    let expected = payload.clone();

    let server = tokio::spawn(async move {
        let conn = listener.accept().await.unwrap().establish().await.unwrap();
        conn.recv().await.unwrap().unwrap()
    });

    let client = CstaConnection::open("127.0.0.1", port, None).await.unwrap();
    client
        .send(&Frame::new(InvokeId::new(9999).unwrap(), payload))
        .await
        .unwrap();

    let received = server.await.unwrap();
    assert_eq!(received.payload, expected);
}

#[tokio::test]
async fn test_concurrent_senders_produce_whole_frames() {
    let (mut listener, port) = bound_listener().await;

    let server = tokio::spawn(async move {
        let conn = listener.accept().await.unwrap().establish().await.unwrap();
        let mut seen = Vec::new();
        for _ in 0..40 {
            seen.push(conn.recv().await.unwrap().unwrap());
        }
        seen
    });

    let client = Arc::new(CstaConnection::open("127.0.0.1", port, None).await.unwrap());
    let ids = Arc::new(InvokeIdService::default());
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let client = Arc::clone(&client);
        let ids = Arc::clone(&ids);
        tasks.push(tokio::spawn(async move {
            for _ in 0..10 {
                let id = ids.next().unwrap();
                client
                    .send(&Frame::new(id, format!("<Msg id=\"{id}\"/>")))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let frames = server.await.unwrap();
    for frame in frames {
        let id = frame.id().expect("well formed id");
        assert_eq!(frame.payload, format!("<Msg id=\"{id}\"/>"));
    }
}

#[tokio::test]
async fn test_tls_loopback_with_verified_certificate() {
    let (listener, port) = tls_listener().await;
    let server = spawn_tls_echo(listener);

    let config = client_tls(CertificatePolicy::Verify);
    let client = CstaConnection::open("localhost", port, Some(&config))
        .await
        .expect("certificate for localhost should verify");
    assert!(client.is_secure());
    assert_eq!(echo_once(&client).await.payload, "<Ping/>");

    client.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_tls_accept_any_skips_verification() {
    let (listener, port) = tls_listener().await;
    let server = spawn_tls_echo(listener);

    let config = TlsClientConfig {
        ca_certs: None,
        policy: CertificatePolicy::AcceptAny,
    };
    let client = CstaConnection::open("127.0.0.1", port, Some(&config))
        .await
        .expect("any certificate is accepted");
    assert_eq!(echo_once(&client).await.payload, "<Ping/>");

    client.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_tls_name_mismatch_fails_verify_but_passes_when_allowed() {
    // The certificate names localhost; dialing the IP is a name mismatch.
    let (listener, port) = tls_listener().await;
    let server = spawn_tls_echo(listener);
    let strict = client_tls(CertificatePolicy::Verify);
    let refused = CstaConnection::open("127.0.0.1", port, Some(&strict)).await;
    assert!(matches!(refused, Err(ConnectError::TlsHandshakeFailed(_))));
    server.await.unwrap();

    let (listener, port) = tls_listener().await;
    let server = spawn_tls_echo(listener);
    let lenient = client_tls(CertificatePolicy::AllowNameMismatch);
    let client = CstaConnection::open("127.0.0.1", port, Some(&lenient))
        .await
        .expect("name mismatch is tolerated");
    assert_eq!(echo_once(&client).await.payload, "<Ping/>");

    client.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_accept_does_not_wait_for_tls_handshake() {
    let (mut listener, port) = tls_listener().await;

    // This client connects but never says hello.
    let _silent = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let stalled = tokio::time::timeout(Duration::from_secs(1), listener.accept())
        .await
        .expect("accept returns before any handshake")
        .unwrap();
    assert!(stalled.is_secure());

    let server = spawn_tls_echo(listener);
    let config = client_tls(CertificatePolicy::Verify);
    let client = CstaConnection::open("localhost", port, Some(&config))
        .await
        .expect("second client is served");
    assert_eq!(echo_once(&client).await.payload, "<Ping/>");

    client.close().await.unwrap();
    server.await.unwrap();
    drop(stalled);
}
