//! Wire format encoding and decoding.
//!
//! Implements the 4-byte packed header:
//! ```text
//! ┌─────────┬─────────────┬──────────┬───────┬───────────────┬─────────────┬──────────┐
//! │ Version │ Header size │ Msg type │ Flags │ Serialization │ Compression │ Reserved │
//! │ 4 bits  │ 4 bits      │ 4 bits   │ 4 bits│ 4 bits        │ 4 bits      │ 8 bits   │
//! └─────────┴─────────────┴──────────┴───────┴───────────────┴─────────────┴──────────┘
//! ```
//!
//! Header size is counted in 4-byte words. The header is followed by the
//! optional event/session fields and the length-prefixed payload, see
//! [`Frame`](super::Frame). All multi-byte integers are Big Endian.

use crate::error::DecodeError;

/// Header size in bytes (fixed, exactly 4).
pub const HEADER_SIZE: usize = 4;

/// Protocol version carried in every outbound header.
pub const PROTOCOL_VERSION: u8 = 0b0001;

/// Header size in 4-byte words, as written into the header.
pub const HEADER_SIZE_WORDS: u8 = 0b0001;

/// Status code reported by a successfully finished session.
pub const STATUS_OK: i64 = 20_000_000;

/// Flag patterns (low nibble of byte 1).
pub mod flags {
    /// Bare frame: header followed directly by the payload.
    pub const NONE: u8 = 0b0000;
    /// Frame carries an event code and a session identifier.
    pub const WITH_EVENT: u8 = 0b0100;

    /// Check whether a flags nibble announces event + session id.
    #[inline]
    pub fn has_event(flags: u8) -> bool {
        flags == WITH_EVENT
    }
}

/// Payload serialization methods (high nibble of byte 2).
pub mod serialization {
    /// Raw bytes.
    pub const RAW: u8 = 0b0000;
    /// JSON document.
    pub const JSON: u8 = 0b0001;
}

/// Payload compression methods (low nibble of byte 2).
pub mod compression {
    /// No compression.
    pub const NONE: u8 = 0b0000;
    /// Gzip.
    pub const GZIP: u8 = 0b0001;
}

/// Event codes carried by frames with [`flags::WITH_EVENT`].
pub mod events {
    /// Client asks to finish the connection.
    pub const FINISH_CONNECTION: u32 = 2;
    /// Server confirms the connection is finished.
    pub const CONNECTION_FINISHED: u32 = 52;
    /// Session completed; payload holds the final status JSON.
    pub const SESSION_FINISHED: u32 = 152;
    /// Session aborted by the server.
    pub const SESSION_FAILED: u32 = 153;
    /// Synthesis of a sentence started.
    pub const TTS_SENTENCE_START: u32 = 350;
    /// Synthesis of a sentence ended.
    pub const TTS_SENTENCE_END: u32 = 351;
    /// Audio chunk.
    pub const TTS_RESPONSE: u32 = 352;

    /// Check whether an event ends the session.
    #[inline]
    pub fn is_terminal(event: u32) -> bool {
        matches!(event, SESSION_FINISHED | SESSION_FAILED)
    }
}

/// Message type (high nibble of byte 1).
///
/// Values outside the known set are kept as [`MessageType::Other`] so the
/// caller can classify them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client request with a full JSON payload (`0b0001`).
    FullClientRequest,
    /// Server response with a JSON payload (`0b1001`).
    FullServerResponse,
    /// Server response carrying raw audio (`0b1011`).
    AudioOnlyResponse,
    /// Server-side error (`0b1111`).
    Error,
    /// Any other nibble value.
    Other(u8),
}

impl MessageType {
    /// Build from the 4-bit wire value.
    pub fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            0b0001 => MessageType::FullClientRequest,
            0b1001 => MessageType::FullServerResponse,
            0b1011 => MessageType::AudioOnlyResponse,
            0b1111 => MessageType::Error,
            other => MessageType::Other(other),
        }
    }

    /// The 4-bit wire value.
    pub fn nibble(self) -> u8 {
        match self {
            MessageType::FullClientRequest => 0b0001,
            MessageType::FullServerResponse => 0b1001,
            MessageType::AudioOnlyResponse => 0b1011,
            MessageType::Error => 0b1111,
            MessageType::Other(v) => v & 0x0F,
        }
    }
}

/// Decoded fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version (4 bits).
    pub version: u8,
    /// Header size in 4-byte words (4 bits).
    pub header_size: u8,
    /// Message type (4 bits).
    pub message_type: MessageType,
    /// Flags nibble (see [`flags`]).
    pub flags: u8,
    /// Payload serialization (see [`serialization`]).
    pub serialization: u8,
    /// Payload compression (see [`compression`]).
    pub compression: u8,
}

impl Header {
    /// Create a header with the default version, size, JSON serialization
    /// and no compression.
    pub fn new(message_type: MessageType, flags: u8) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            header_size: HEADER_SIZE_WORDS,
            message_type,
            flags,
            serialization: serialization::JSON,
            compression: compression::NONE,
        }
    }

    /// Encode header to bytes.
    ///
    /// Fields are assumed to fit in 4 bits; higher bits are dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use doubao_tts::protocol::{flags, Header, MessageType};
    ///
    /// let header = Header::new(MessageType::AudioOnlyResponse, flags::NONE);
    /// assert_eq!(header.encode(), [0x11, 0xB0, 0x10, 0x00]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        [
            (self.version << 4) | (self.header_size & 0x0F),
            (self.message_type.nibble() << 4) | (self.flags & 0x0F),
            (self.serialization << 4) | (self.compression & 0x0F),
            0x00,
        ]
    }

    /// Decode header from the first 4 bytes of `buf`.
    ///
    /// The reserved byte is ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < HEADER_SIZE {
            return Err(DecodeError::IncompleteHeader { len: buf.len() });
        }
        Ok(Self {
            version: buf[0] >> 4,
            header_size: buf[0] & 0x0F,
            message_type: MessageType::from_nibble(buf[1] >> 4),
            flags: buf[1] & 0x0F,
            serialization: buf[2] >> 4,
            compression: buf[2] & 0x0F,
        })
    }

    /// Check if the flags announce event + session id.
    #[inline]
    pub fn has_event(&self) -> bool {
        flags::has_event(self.flags)
    }

    /// Check if this is an error message.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.message_type == MessageType::Error
    }
}
