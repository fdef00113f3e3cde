//! The CSTA-over-TCP wire frame.
//!
//! ```text
//! byte 0-1  version   u16, network order, always 0
//! byte 2-3  length    u16, network order, header + payload
//! byte 4-7  invoke id four ASCII digits
//! byte 8..  payload   XML text
//! ```
//!
//! [`FrameCodec`] plugs into `tokio_util`'s `FramedRead`/`FramedWrite`. The
//! decoder buffers until a whole frame is present, so a stream that trickles
//! in a few bytes at a time decodes exactly like one that arrives at once.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{FrameError, InvokeField, InvokeId};

/// Size of the fixed header.
pub const HEADER_LEN: usize = 8;

/// The only header version this codec writes.
pub const FRAME_VERSION: u16 = 0;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - HEADER_LEN;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Correlation field from the header.
    pub invoke_id: InvokeField,
    /// Payload text.
    pub payload: String,
}

impl Frame {
    /// Creates a frame for an outgoing message.
    pub fn new(invoke_id: impl Into<InvokeField>, payload: impl Into<String>) -> Self {
        Self {
            invoke_id: invoke_id.into(),
            payload: payload.into(),
        }
    }

    /// Returns the parsed invoke id, if the field was well formed.
    pub fn id(&self) -> Option<InvokeId> {
        self.invoke_id.id()
    }

    /// Encodes the frame into a standalone byte vector.
    ///
    /// # Errors
    /// Returns [`FrameError::PayloadTooLarge`] when the payload exceeds
    /// [`MAX_PAYLOAD_LEN`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        self.write_to(&mut buf)?;
        Ok(buf.to_vec())
    }

    fn write_to(&self, dst: &mut BytesMut) -> Result<(), FrameError> {
        let payload = self.payload.as_bytes();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge(payload.len()));
        }

        dst.reserve(HEADER_LEN + payload.len());
        dst.put_u16(FRAME_VERSION);
        dst.put_u16((HEADER_LEN + payload.len()) as u16);
        dst.put_slice(&self.invoke_id.to_wire());
        dst.put_slice(payload);
        Ok(())
    }
}

/// Length-prefixed frame codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        let version = u16::from_be_bytes([src[0], src[1]]);
        let length = u16::from_be_bytes([src[2], src[3]]) as usize;
        if length < HEADER_LEN {
            return Err(FrameError::InvalidLength(length));
        }
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }
        if version != FRAME_VERSION {
            tracing::debug!(version, "frame with unexpected header version");
        }

        let mut frame = src.split_to(length);
        frame.advance(4);
        let invoke_id = InvokeField::from_wire([frame[0], frame[1], frame[2], frame[3]]);
        frame.advance(4);
        let payload = String::from_utf8_lossy(&frame).into_owned();

        Ok(Some(Frame { invoke_id, payload }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::Truncated { buffered: src.len() }),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        frame.write_to(dst)
    }
}

impl Encoder<&Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        frame.write_to(dst)
    }
}
