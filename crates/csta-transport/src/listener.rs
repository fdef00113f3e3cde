//! Server-side listener for plain and TLS CSTA connections.
//!
//! [`CstaListener::accept`] only takes the TCP socket. The TLS handshake is
//! deferred to [`Incoming::establish`], which the caller runs on the
//! connection's own task so a slow client cannot hold up the accept loop.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

use crate::tls::TlsServerConfig;
use crate::{CstaConnection, Transport, TransportError};

/// How long an accepted socket may take to finish the TLS handshake.
const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`Transport`] that accepts CSTA connections.
pub struct CstaListener {
    /// `None` once the listener has been shut down.
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    acceptor: Option<TlsAcceptor>,
}

impl CstaListener {
    /// Binds to `addr`. With `tls`, every accepted socket is upgraded.
    pub async fn bind(
        addr: &str,
        tls: Option<&TlsServerConfig>,
    ) -> Result<Self, TransportError> {
        let acceptor = tls.map(TlsServerConfig::acceptor).transpose()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local_addr = listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(%local_addr, secure = acceptor.is_some(), "CSTA listener bound");
        Ok(Self {
            listener: Some(listener),
            local_addr,
            acceptor,
        })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Ok(self.local_addr)
    }

    /// Whether accepted connections are upgraded to TLS.
    pub fn is_secure(&self) -> bool {
        self.acceptor.is_some()
    }
}

impl Transport for CstaListener {
    type Connection = Incoming;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Incoming, TransportError> {
        let Some(listener) = &self.listener else {
            return Err(TransportError::Shutdown);
        };
        let (stream, peer_addr) = listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer_addr, error = %e, "could not disable Nagle");
        }

        Ok(Incoming {
            stream,
            peer_addr,
            acceptor: self.acceptor.clone(),
        })
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        if self.listener.take().is_some() {
            tracing::info!(local_addr = %self.local_addr, "CSTA listener shut down");
        }
        Ok(())
    }
}

/// An accepted socket whose TLS handshake, if any, has not run yet.
pub struct Incoming {
    stream: TcpStream,
    peer_addr: SocketAddr,
    acceptor: Option<TlsAcceptor>,
}

impl Incoming {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Whether [`establish`](Self::establish) will run a TLS handshake.
    pub fn is_secure(&self) -> bool {
        self.acceptor.is_some()
    }

    /// Finishes the TLS handshake when the listener serves TLS, then wraps
    /// the stream in a framed connection.
    pub async fn establish(self) -> Result<CstaConnection, TransportError> {
        let Self {
            stream,
            peer_addr,
            acceptor,
        } = self;
        let Some(acceptor) = acceptor else {
            return Ok(CstaConnection::from_stream(stream, Some(peer_addr), false));
        };

        match tokio::time::timeout(TLS_HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
            Ok(Ok(stream)) => Ok(CstaConnection::from_stream(stream, Some(peer_addr), true)),
            Ok(Err(e)) => {
                tracing::debug!(%peer_addr, error = %e, "TLS handshake failed");
                Err(TransportError::AcceptFailed(e))
            }
            Err(_) => {
                tracing::debug!(%peer_addr, "TLS handshake timed out");
                Err(TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "TLS handshake timed out",
                )))
            }
        }
    }
}

impl std::fmt::Debug for Incoming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Incoming")
            .field("peer_addr", &self.peer_addr)
            .field("secure", &self.is_secure())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accept_after_shutdown_reports_shutdown() {
        let mut listener = CstaListener::bind("127.0.0.1:0", None).await.unwrap();
        let addr = listener.local_addr().unwrap();

        listener.shutdown().await.unwrap();
        assert!(matches!(listener.accept().await, Err(TransportError::Shutdown)));

        // The socket is closed, not just ignored.
        assert!(TcpStream::connect(addr).await.is_err());

        // A second shutdown is harmless.
        listener.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_accept_returns_plain_incoming_connection() {
        let mut listener = CstaListener::bind("127.0.0.1:0", None).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(!listener.is_secure());

        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let incoming = listener.accept().await.unwrap();
        let _client = client.await.unwrap();

        assert!(!incoming.is_secure());
        let conn = incoming.establish().await.unwrap();
        assert!(!conn.is_secure());
        assert!(conn.peer_addr().is_some());
    }
}
