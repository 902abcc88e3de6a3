//! Protocol module - wire format and frame types.
//!
//! This module implements the binary protocol spoken over the TTS WebSocket:
//! - 4-byte bit-packed header encoding/decoding
//! - Frame struct with the optional event/session context
//! - Message type, flag and event constants

mod frame;
mod wire_format;

pub use frame::{decode_frame, encode_frame, Frame, FrameContext};
pub use wire_format::{
    compression, events, flags, serialization, Header, MessageType, HEADER_SIZE,
    HEADER_SIZE_WORDS, PROTOCOL_VERSION, STATUS_OK,
};
