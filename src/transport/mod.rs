//! Transport module - WebSocket connection to the TTS service.
//!
//! One connection carries exactly one synthesis session; it is opened right
//! before the request frame is sent and closed when the session ends.

mod websocket;

pub use websocket::{connect, Connection, WsStream, LOG_ID_HEADER};
