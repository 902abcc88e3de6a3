//! Error types for doubao-tts.

use std::time::Duration;

use thiserror::Error;

/// Failure to parse an inbound frame.
///
/// A decode error never carries a partial frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer than 4 bytes, so not even the fixed header is present.
    #[error("incomplete header: got {len} bytes, need 4")]
    IncompleteHeader {
        /// Number of bytes received.
        len: usize,
    },

    /// A field (or its length prefix) runs past the end of the input.
    #[error("truncated frame: {field} needs {needed} bytes, {available} available")]
    Truncated {
        /// Name of the field being read.
        field: &'static str,
        /// Bytes required by the field.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// Session identifier bytes are not valid UTF-8.
    #[error("session id is not valid UTF-8")]
    InvalidSessionId,
}

/// Main error type for all synthesis operations.
#[derive(Debug, Error)]
pub enum TtsError {
    /// I/O error (e.g. writing the audio file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Malformed inbound frame.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The server sent a frame with message type `Error`.
    #[error("Server error: {message}")]
    Server {
        /// Payload of the error frame, decoded lossily as UTF-8.
        message: String,
    },

    /// The session ended with a non-success status.
    #[error("Session failed (status {status_code:?}): {message}")]
    SessionFailed {
        /// Status code reported by the server, if any.
        status_code: Option<i64>,
        /// Server-provided message or raw payload.
        message: String,
    },

    /// No frame arrived within the read timeout.
    #[error("Timed out after {0:?} waiting for the next frame")]
    Timeout(Duration),

    /// Connection closed before a terminal event.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The session finished without producing any audio.
    #[error("Session finished without audio")]
    NoAudio,
}

/// Result type alias using TtsError.
pub type Result<T> = std::result::Result<T, TtsError>;
