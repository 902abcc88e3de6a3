//! Frame struct, encoder and decoder.
//!
//! Layout after the 4-byte header:
//! ```text
//! [event: u32 BE] [session_id_len: u32 BE] [session_id: UTF-8]   only with flags::WITH_EVENT
//! [payload_len: u32 BE] [payload]
//! ```
//!
//! # Example
//!
//! ```
//! use doubao_tts::protocol::{events, Frame, MessageType};
//!
//! let frame = Frame::with_session(MessageType::AudioOnlyResponse, events::TTS_RESPONSE, "s-1", &b"pcm"[..]);
//! let bytes = frame.encode();
//! let decoded = Frame::decode(&bytes).unwrap();
//!
//! assert_eq!(decoded, frame);
//! assert_eq!(decoded.event(), Some(events::TTS_RESPONSE));
//! ```

use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{flags, Header, MessageType, HEADER_SIZE};
use crate::error::DecodeError;

/// Size of each length prefix and of the event code.
const WORD: usize = 4;

/// Optional per-frame session context.
///
/// Either both the event code and the session id are on the wire, or neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameContext {
    /// No event, no session id.
    Bare,
    /// Event code plus session identifier.
    Session {
        /// Event code (see [`events`](super::events)).
        event: u32,
        /// Session identifier; may be empty.
        session_id: String,
    },
}

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Fixed header. On encode, the event bit of `flags` follows `context`.
    pub header: Header,
    /// Event and session id, if present.
    pub context: FrameContext,
    /// JSON document or raw audio.
    pub payload: Bytes,
}

impl Frame {
    /// Create a bare frame (no event, no session id).
    pub fn bare(message_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            header: Header::new(message_type, flags::NONE),
            context: FrameContext::Bare,
            payload: payload.into(),
        }
    }

    /// Create a frame carrying an event code and session id.
    pub fn with_session(
        message_type: MessageType,
        event: u32,
        session_id: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            header: Header::new(message_type, flags::WITH_EVENT),
            context: FrameContext::Session {
                event,
                session_id: session_id.into(),
            },
            payload: payload.into(),
        }
    }

    /// Create the client request frame that starts a synthesis.
    pub fn client_request(payload: impl Into<Bytes>) -> Self {
        Self::bare(MessageType::FullClientRequest, payload)
    }

    /// Get the message type.
    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// Get the event code, if present.
    #[inline]
    pub fn event(&self) -> Option<u32> {
        match &self.context {
            FrameContext::Session { event, .. } => Some(*event),
            FrameContext::Bare => None,
        }
    }

    /// Get the session id, if present.
    #[inline]
    pub fn session_id(&self) -> Option<&str> {
        match &self.context {
            FrameContext::Session { session_id, .. } => Some(session_id),
            FrameContext::Bare => None,
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Check if this is an error frame.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.header.is_error()
    }

    /// Number of bytes [`encode`](Self::encode) produces.
    pub fn encoded_len(&self) -> usize {
        let context = match &self.context {
            FrameContext::Bare => 0,
            FrameContext::Session { session_id, .. } => WORD + WORD + session_id.len(),
        };
        HEADER_SIZE + context + WORD + self.payload.len()
    }

    /// Encode the frame into a contiguous buffer.
    ///
    /// Never fails; field widths are the caller's responsibility. The session
    /// id and payload are each limited to `u32::MAX` bytes by their length
    /// prefixes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.to_vec()
    }

    /// Append the encoded frame to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.wire_header().encode());
        if let FrameContext::Session { event, session_id } = &self.context {
            buf.put_u32(*event);
            buf.put_u32(length_prefix(session_id.len()));
            buf.put_slice(session_id.as_bytes());
        }
        buf.put_u32(length_prefix(self.payload.len()));
        buf.put_slice(&self.payload);
    }

    /// The header as written: flags announce event + session id exactly when
    /// `context` carries them.
    fn wire_header(&self) -> Header {
        let mut header = self.header;
        match self.context {
            FrameContext::Session { .. } => header.flags = flags::WITH_EVENT,
            FrameContext::Bare if flags::has_event(header.flags) => header.flags = flags::NONE,
            FrameContext::Bare => {}
        }
        header
    }

    /// Decode a frame from one transport message (copies the payload).
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let layout = Layout::parse(buf)?;
        let payload = Bytes::copy_from_slice(&buf[layout.payload.clone()]);
        Ok(layout.into_frame(payload))
    }

    /// Decode a frame, sharing the payload with `data` (zero-copy).
    pub fn decode_bytes(data: Bytes) -> Result<Self, DecodeError> {
        let layout = Layout::parse(&data)?;
        let payload = data.slice(layout.payload.clone());
        Ok(layout.into_frame(payload))
    }
}

/// Field positions of a validated frame.
struct Layout {
    header: Header,
    context: FrameContext,
    payload: Range<usize>,
}

impl Layout {
    fn parse(buf: &[u8]) -> Result<Self, DecodeError> {
        let header = Header::decode(buf)?;
        let mut cursor = Cursor {
            buf,
            pos: HEADER_SIZE,
        };

        let context = if header.has_event() {
            let event = cursor.read_u32("event")?;
            let len = cursor.read_u32("session id length")? as usize;
            let range = cursor.take(len, "session id")?;
            let session_id = std::str::from_utf8(&buf[range])
                .map_err(|_| DecodeError::InvalidSessionId)?
                .to_owned();
            FrameContext::Session { event, session_id }
        } else {
            FrameContext::Bare
        };

        let len = cursor.read_u32("payload length")? as usize;
        let payload = cursor.take(len, "payload")?;

        Ok(Self {
            header,
            context,
            payload,
        })
    }

    fn into_frame(self, payload: Bytes) -> Frame {
        Frame {
            header: self.header,
            context: self.context,
            payload,
        }
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<Range<usize>, DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                field,
                needed: len,
                available: self.remaining(),
            });
        }
        let range = self.pos..self.pos + len;
        self.pos += len;
        Ok(range)
    }

    fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let range = self.take(WORD, field)?;
        let b = &self.buf[range];
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

fn length_prefix(len: usize) -> u32 {
    debug_assert!(u32::try_from(len).is_ok(), "field of {} bytes exceeds u32 length prefix", len);
    len as u32
}

/// Encode a frame to bytes (standalone function).
#[inline]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    frame.encode()
}

/// Decode a frame from bytes (standalone function).
#[inline]
pub fn decode_frame(buf: &[u8]) -> Result<Frame, DecodeError> {
    Frame::decode(buf)
}
