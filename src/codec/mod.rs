//! Codec module - serialization/deserialization for control payloads.
//!
//! - [`JsonCodec`] - JSON using `serde_json`, for request bodies and the
//!   status documents the server attaches to session events
//!
//! Audio payloads are raw bytes and are taken from the frame as-is.
//!
//! # Example
//!
//! ```
//! use doubao_tts::codec::JsonCodec;
//!
//! let encoded = JsonCodec::encode(&"你好").unwrap();
//! assert_eq!(encoded, "\"你好\"".as_bytes());
//! let decoded: String = JsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "你好");
//! ```

mod json;

pub use json::JsonCodec;
