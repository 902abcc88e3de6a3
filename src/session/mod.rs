//! Session module - one synthesis request and its streamed response.
//!
//! - [`Synthesizer`]: connection lifecycle and batch helpers
//! - [`collect_audio`] / [`exchange`]: the read loop, generic over any
//!   WebSocket message stream
//! - [`SessionCollector`]: per-frame audio accumulation and terminal handling

mod collector;
mod synthesizer;

pub use collector::{SessionCollector, Step, Synthesis};
pub use synthesizer::{collect_audio, exchange, Synthesizer};
