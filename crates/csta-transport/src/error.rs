/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] FrameError),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] FrameError),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// TLS settings could not be turned into an acceptor.
    #[error("TLS setup failed: {0}")]
    Tls(#[from] crate::tls::TlsSetupError),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}

/// Errors produced while encoding or decoding a wire frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The header announced a total length smaller than the header itself.
    #[error("impossible frame length {0} (minimum is 8)")]
    InvalidLength(usize),

    /// The payload does not fit the 16-bit length field.
    #[error("payload of {0} bytes exceeds the 65527 byte frame limit")]
    PayloadTooLarge(usize),

    /// The stream ended in the middle of a frame.
    #[error("stream ended with {buffered} bytes of an incomplete frame")]
    Truncated {
        /// Bytes of the partial frame that were buffered at EOF.
        buffered: usize,
    },
}

/// Outcome of a failed [`CstaConnection::open`](crate::CstaConnection::open).
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The TCP connection could not be established.
    #[error("server unreachable: {0}")]
    Unreachable(#[source] std::io::Error),

    /// TCP connected but the TLS handshake did not complete.
    #[error("TLS handshake failed: {0}")]
    TlsHandshakeFailed(#[source] std::io::Error),

    /// The request cannot be served by this build or configuration.
    #[error("unsupported connection request: {0}")]
    Unsupported(String),
}

/// Errors from the invoke-id allocator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeIdError {
    /// Every 4-digit id has been issued and the policy forbids wrapping.
    #[error("invoke id space exhausted (last issued {last})")]
    Exhausted {
        /// The last id that was handed out.
        last: u16,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_display_mentions_length() {
        let err = FrameError::InvalidLength(3);
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_transport_error_wraps_frame_error_as_source() {
        use std::error::Error;
        let err = TransportError::ReceiveFailed(FrameError::Truncated {
            buffered: 5,
        });
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invoke_id_error_display() {
        let err = InvokeIdError::Exhausted { last: 9999 };
        assert_eq!(err.to_string(), "invoke id space exhausted (last issued 9999)");
    }
}
