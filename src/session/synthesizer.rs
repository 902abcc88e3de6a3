//! Synthesizer and the request/response loop.
//!
//! The [`Synthesizer`] owns a [`TtsConfig`] and runs one session per call:
//! 1. Open a WebSocket connection
//! 2. Send a single client request frame with the JSON request
//! 3. Read frames until a terminal event, accumulating audio
//! 4. Close the connection, whatever the outcome
//!
//! # Example
//!
//! ```no_run
//! use doubao_tts::{SynthesisRequest, Synthesizer, TtsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let synthesizer = Synthesizer::new(TtsConfig::from_env()?);
//!     let synthesis = synthesizer
//!         .synthesize(&SynthesisRequest::new("你好，世界"))
//!         .await?;
//!     synthesis.save("hello.wav").await?;
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use super::collector::{SessionCollector, Step, Synthesis};
use crate::config::TtsConfig;
use crate::error::{Result, TtsError};
use crate::protocol::Frame;
use crate::request::SynthesisRequest;
use crate::transport::{connect, Connection};

/// Runs synthesis sessions against the configured service.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config: TtsConfig,
}

impl Synthesizer {
    /// Create a synthesizer from an explicit configuration.
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }

    /// Create a synthesizer from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(TtsConfig::from_env()?))
    }

    /// Get the configuration.
    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    /// Synthesize one request over a fresh connection.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<Synthesis> {
        let payload = request.payload(&self.config)?;

        let Connection {
            mut stream,
            request_id,
            log_id,
        } = connect(&self.config).await?;

        tracing::info!(
            request_id = %request_id,
            chars = request.text().chars().count(),
            "Sending synthesis request"
        );

        let mut synthesis = exchange(&mut stream, payload, self.config.read_timeout).await?;
        synthesis.log_id = log_id;
        Ok(synthesis)
    }

    /// Synthesize one request and write the audio to `path`.
    pub async fn synthesize_to_file(
        &self,
        request: &SynthesisRequest,
        path: impl AsRef<Path>,
    ) -> Result<Synthesis> {
        let synthesis = self.synthesize(request).await?;
        synthesis.save(path).await?;
        Ok(synthesis)
    }

    /// Synthesize requests one after another, each on its own connection.
    ///
    /// A failed request does not stop the batch.
    pub async fn synthesize_batch(&self, requests: &[SynthesisRequest]) -> Vec<Result<Synthesis>> {
        let mut results = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            let result = self.synthesize(request).await;
            if let Err(e) = &result {
                tracing::warn!(index = i, "Batch item failed: {}", e);
            }
            results.push(result);
        }
        results
    }
}

/// Send `payload` as the client request, collect the response, and close
/// `socket` on every exit path.
pub async fn exchange<S>(socket: &mut S, payload: Vec<u8>, read_timeout: Duration) -> Result<Synthesis>
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>>
        + Sink<WsMessage, Error = WsError>
        + Unpin,
{
    let result = send_and_collect(socket, payload, read_timeout).await;
    if let Err(e) = socket.close().await {
        tracing::debug!("Error closing connection: {}", e);
    }
    result
}

async fn send_and_collect<S>(socket: &mut S, payload: Vec<u8>, read_timeout: Duration) -> Result<Synthesis>
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>>
        + Sink<WsMessage, Error = WsError>
        + Unpin,
{
    let frame = Frame::client_request(payload);
    socket.send(WsMessage::Binary(frame.encode())).await?;
    collect_audio(socket, read_timeout).await
}

/// Read frames until the session ends and return the accumulated audio.
///
/// Each read is bounded by `read_timeout`. Text messages and ping/pong are
/// skipped; a close or end of stream before the terminal event fails with
/// [`TtsError::ConnectionClosed`].
pub async fn collect_audio<S>(stream: &mut S, read_timeout: Duration) -> Result<Synthesis>
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
{
    let mut collector = SessionCollector::new();

    loop {
        let message = match tokio::time::timeout(read_timeout, stream.next()).await {
            Err(_) => return Err(TtsError::Timeout(read_timeout)),
            Ok(None) => return Err(TtsError::ConnectionClosed),
            Ok(Some(message)) => message?,
        };

        let data = match message {
            WsMessage::Binary(data) => data,
            WsMessage::Text(text) => {
                tracing::warn!("Ignoring text message: {}", text);
                continue;
            }
            WsMessage::Close(frame) => {
                tracing::debug!(?frame, "Server closed the connection");
                return Err(TtsError::ConnectionClosed);
            }
            _ => continue,
        };

        let frame = Frame::decode_bytes(Bytes::from(data))?;
        tracing::debug!(
            message_type = ?frame.message_type(),
            event = ?frame.event(),
            len = frame.payload.len(),
            "Received frame"
        );

        if collector.push(frame)? == Step::Finished {
            return collector.finish(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{events, MessageType};
    use futures_util::stream;

    type Item = std::result::Result<WsMessage, WsError>;

    /// Endpoint on a local port that was just released, so nothing listens.
    fn closed_endpoint() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("ws://127.0.0.1:{}/stream", port)
    }

    fn binary(frame: Frame) -> Item {
        Ok(WsMessage::Binary(frame.encode()))
    }

    fn audio(len: usize) -> Item {
        binary(Frame::with_session(
            MessageType::AudioOnlyResponse,
            events::TTS_RESPONSE,
            "s",
            vec![0xAB; len],
        ))
    }

    fn finished() -> Item {
        binary(Frame::with_session(
            MessageType::FullServerResponse,
            events::SESSION_FINISHED,
            "s",
            &br#"{"status_code":20000000}"#[..],
        ))
    }

    #[tokio::test]
    async fn test_collect_audio_until_finished() {
        let mut messages = stream::iter(vec![audio(100), audio(50), finished(), audio(7)]);
        let synthesis = collect_audio(&mut messages, Duration::from_secs(1)).await.unwrap();

        assert_eq!(synthesis.len(), 150);
        // Frames after the terminal event are left unread.
        assert!(messages.next().await.is_some());
    }

    #[tokio::test]
    async fn test_text_and_ping_skipped() {
        let mut messages = stream::iter(vec![
            Ok(WsMessage::Text("hello".into())),
            Ok(WsMessage::Ping(vec![1])),
            audio(10),
            finished(),
        ]);
        let synthesis = collect_audio(&mut messages, Duration::from_secs(1)).await.unwrap();
        assert_eq!(synthesis.len(), 10);
    }

    #[tokio::test]
    async fn test_end_of_stream_before_terminal() {
        let mut messages = stream::iter(vec![audio(10)]);
        let result = collect_audio(&mut messages, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(TtsError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_close_before_terminal() {
        let mut messages = stream::iter(vec![audio(10), Ok(WsMessage::Close(None))]);
        let result = collect_audio(&mut messages, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(TtsError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let mut messages = stream::iter(vec![audio(10)]).chain(stream::pending());
        let timeout = Duration::from_millis(20);
        let result = collect_audio(&mut messages, timeout).await;
        assert!(matches!(result, Err(TtsError::Timeout(t)) if t == timeout));
    }

    #[tokio::test]
    async fn test_malformed_frame_aborts() {
        let mut messages = stream::iter(vec![
            audio(10),
            Ok(WsMessage::Binary(vec![0x11, 0xB0])),
            finished(),
        ]);
        let result = collect_audio(&mut messages, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(TtsError::Decode(_))));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let mut messages = stream::iter(vec![Err(WsError::ConnectionClosed)]);
        let result = collect_audio(&mut messages, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(TtsError::WebSocket(_))));
    }

    #[test]
    fn test_synthesizer_keeps_config() {
        let config = TtsConfig::builder("app", "token").build().unwrap();
        let synthesizer = Synthesizer::new(config);
        assert_eq!(synthesizer.config().app_id, "app");
    }

    #[tokio::test]
    async fn test_batch_reports_each_failure() {
        let config = TtsConfig::builder("app", "token")
            .endpoint(closed_endpoint())
            .build()
            .unwrap();
        let synthesizer = Synthesizer::new(config);

        let results = synthesizer
            .synthesize_batch(&[SynthesisRequest::new("一"), SynthesisRequest::new("二")])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| matches!(r, Err(TtsError::WebSocket(_)))));
    }
}
