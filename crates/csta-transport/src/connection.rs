//! A framed CSTA connection over plain TCP or TLS.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
    ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::tls::{self, TlsClientConfig};
use crate::{ConnectError, ConnectionId, Frame, FrameCodec, TransportError};

/// Conventional plain-text CSTA port.
pub const DEFAULT_PORT: u16 = 4721;

/// Conventional TLS CSTA port.
pub const DEFAULT_TLS_PORT: u16 = 4722;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Any byte stream a connection can run over.
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> Stream for T {}

type BoxedStream = Box<dyn Stream>;
type FrameReader = FramedRead<BufReader<ReadHalf<BoxedStream>>, FrameCodec>;
type FrameWriter = FramedWrite<WriteHalf<BoxedStream>, FrameCodec>;

/// One side of a CSTA link.
///
/// Reads and writes are independent: a task may sit in [`recv`](Self::recv)
/// while others call [`send`](Self::send). Only one reader is expected at a
/// time; the engines dedicate a task to it.
pub struct CstaConnection {
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    secure: bool,
    reader: Mutex<Option<FrameReader>>,
    writer: Mutex<Option<FrameWriter>>,
    closed: CancellationToken,
}

impl CstaConnection {
    /// Connects to `host:port`, upgrading to TLS when `tls` is given.
    ///
    /// # Errors
    /// - [`ConnectError::Unsupported`] when the TLS settings or host name
    ///   cannot be used. No socket is opened in that case.
    /// - [`ConnectError::Unreachable`] when the TCP connect fails.
    /// - [`ConnectError::TlsHandshakeFailed`] when the handshake fails.
    pub async fn open(
        host: &str,
        port: u16,
        tls: Option<&TlsClientConfig>,
    ) -> Result<Self, ConnectError> {
        let upgrade = match tls {
            Some(config) => {
                let connector = config
                    .connector()
                    .map_err(|e| ConnectError::Unsupported(e.to_string()))?;
                let name = tls::server_name(host)
                    .map_err(|e| ConnectError::Unsupported(e.to_string()))?;
                Some((connector, name))
            }
            None => None,
        };

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(ConnectError::Unreachable)?;
        let peer_addr = stream.peer_addr().ok();
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle");
        }

        match upgrade {
            None => Ok(Self::from_stream(stream, peer_addr, false)),
            Some((connector, name)) => {
                let stream = connector
                    .connect(name, stream)
                    .await
                    .map_err(ConnectError::TlsHandshakeFailed)?;
                Ok(Self::from_stream(stream, peer_addr, true))
            }
        }
    }

    /// Wraps an already-established stream.
    pub fn from_stream<S: Stream>(
        stream: S,
        peer_addr: Option<SocketAddr>,
        secure: bool,
    ) -> Self {
        let boxed: BoxedStream = Box::new(stream);
        let (read_half, write_half) = tokio::io::split(boxed);
        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, ?peer_addr, secure, "connection opened");

        Self {
            id,
            peer_addr,
            secure,
            reader: Mutex::new(Some(FramedRead::new(
                BufReader::new(read_half),
                FrameCodec,
            ))),
            writer: Mutex::new(Some(FramedWrite::new(write_half, FrameCodec))),
            closed: CancellationToken::new(),
        }
    }

    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the remote address, when the stream has one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Whether the stream is TLS protected.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Writes one frame and flushes it.
    pub async fn send(&self, frame: &Frame) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| {
            TransportError::ConnectionClosed("closed locally".into())
        })?;
        writer.send(frame).await.map_err(TransportError::SendFailed)?;
        tracing::trace!(id = %self.id, invoke_id = %frame.invoke_id, "frame sent");
        Ok(())
    }

    /// Waits for the next frame.
    ///
    /// Returns `Ok(None)` when the peer closes the stream or this side is
    /// closed. Cancel safe: dropping the future keeps any partially
    /// received frame buffered for the next call.
    pub async fn recv(&self) -> Result<Option<Frame>, TransportError> {
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Ok(None);
        };

        let next = tokio::select! {
            _ = self.closed.cancelled() => return Ok(None),
            next = reader.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                tracing::trace!(
                    id = %self.id,
                    invoke_id = %frame.invoke_id,
                    len = frame.payload.len(),
                    "frame received"
                );
                Ok(Some(frame))
            }
            Some(Err(e)) => Err(TransportError::ReceiveFailed(e)),
            None => Ok(None),
        }
    }

    /// Returns `true` if inbound bytes are already available.
    ///
    /// Never waits. While another task is inside [`recv`](Self::recv) the
    /// reader is busy and this reports `false`.
    pub async fn has_pending_data(&self) -> bool {
        let Ok(mut guard) = self.reader.try_lock() else {
            return false;
        };
        let Some(reader) = guard.as_mut() else {
            return false;
        };
        if !reader.read_buffer().is_empty() {
            return true;
        }
        matches!(
            tokio::time::timeout(Duration::ZERO, reader.get_mut().fill_buf()).await,
            Ok(Ok(buf)) if !buf.is_empty()
        )
    }

    /// Closes the connection. Safe to call more than once.
    ///
    /// A task blocked in [`recv`](Self::recv) is woken and sees `Ok(None)`.
    pub async fn close(&self) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        self.closed.cancel();

        let reader = self.reader.lock().await.take();
        drop(reader);

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.get_mut().shutdown().await {
                tracing::debug!(id = %self.id, error = %e, "shutdown on close failed");
            }
        }

        tracing::debug!(id = %self.id, "connection closed");
        Ok(())
    }
}

impl std::fmt::Debug for CstaConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CstaConnection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("secure", &self.secure)
            .field("closed", &self.is_closed())
            .finish()
    }
}
