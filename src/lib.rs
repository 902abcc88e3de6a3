//! # doubao-tts
//!
//! Rust client for the Volcengine Doubao text-to-speech v3 streaming API.
//!
//! This crate sends a text request over a WebSocket and collects the audio the
//! service streams back, using the service's binary framing.
//!
//! ## Architecture
//!
//! - **Protocol**: 4-byte bit-packed header, optional event + session id,
//!   length-prefixed payload
//! - **Session**: one request frame out, audio frames in until a terminal event
//! - **Transport**: one authenticated WebSocket connection per session
//!
//! ## Example
//!
//! ```no_run
//! use doubao_tts::{SynthesisRequest, Synthesizer, TtsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TtsConfig::from_env()?;
//!     let synthesizer = Synthesizer::new(config);
//!
//!     let request = SynthesisRequest::new("今天天气真不错").emotion("happy");
//!     synthesizer.synthesize_to_file(&request, "weather.wav").await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod request;
pub mod session;
pub mod transport;

pub use config::{TtsConfig, TtsConfigBuilder};
pub use error::{DecodeError, TtsError};
pub use request::{AudioFormat, SynthesisRequest};
pub use session::{Synthesis, Synthesizer};
