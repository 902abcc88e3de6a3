//! Per-session frame accumulation.
//!
//! [`SessionCollector`] consumes decoded inbound frames in arrival order and
//! appends every audio payload to one buffer until a terminal event arrives.

use std::path::Path;

use bytes::{Bytes, BytesMut};
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::{Result, TtsError};
use crate::protocol::{events, Frame, MessageType, STATUS_OK};

/// Outcome of feeding one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More frames are expected.
    Continue,
    /// The session finished successfully.
    Finished,
}

/// Audio produced by one session.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Concatenated audio payloads.
    pub audio: Bytes,
    /// Session id announced by the server.
    pub session_id: Option<String>,
    /// Number of completed sentences.
    pub sentences: usize,
    /// Server log id from the connection handshake.
    pub log_id: Option<String>,
}

impl Synthesis {
    /// Audio size in bytes.
    pub fn len(&self) -> usize {
        self.audio.len()
    }

    /// Check if there is no audio.
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }

    /// Write the audio to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::write(path, &self.audio).await?;
        tracing::info!(
            path = %path.display(),
            bytes = self.audio.len(),
            "Saved audio"
        );
        Ok(())
    }
}

/// Accumulates audio across the frames of one session.
#[derive(Debug, Default)]
pub struct SessionCollector {
    audio: BytesMut,
    session_id: Option<String>,
    sentences: usize,
    frames: usize,
}

impl SessionCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of audio collected so far.
    pub fn audio_len(&self) -> usize {
        self.audio.len()
    }

    /// Process one inbound frame.
    ///
    /// # Errors
    ///
    /// - [`TtsError::Server`] for a frame of type `Error`
    /// - [`TtsError::SessionFailed`] for `SessionFailed`, or `SessionFinished`
    ///   with a status code other than 20000000
    pub fn push(&mut self, frame: Frame) -> Result<Step> {
        self.frames += 1;

        if frame.is_error() {
            let message = String::from_utf8_lossy(frame.payload()).into_owned();
            return Err(TtsError::Server { message });
        }

        if self.session_id.is_none() {
            if let Some(id) = frame.session_id().filter(|id| !id.is_empty()) {
                self.session_id = Some(id.to_owned());
            }
        }

        match frame.event() {
            Some(events::TTS_RESPONSE) => self.append(&frame),
            Some(events::TTS_SENTENCE_START) => {
                tracing::debug!(session_id = ?frame.session_id(), "Sentence started");
            }
            Some(events::TTS_SENTENCE_END) => {
                self.sentences += 1;
                tracing::debug!(sentences = self.sentences, "Sentence finished");
            }
            Some(event) if events::is_terminal(event) => {
                if event == events::SESSION_FAILED {
                    return Err(session_failed(frame.payload()));
                }
                check_finish_status(frame.payload())?;
                return Ok(Step::Finished);
            }
            Some(other) => {
                tracing::debug!(event = other, "Skipping unhandled event");
            }
            None if frame.message_type() == MessageType::AudioOnlyResponse => self.append(&frame),
            None => {
                tracing::debug!(message_type = ?frame.message_type(), "Skipping bare frame");
            }
        }

        Ok(Step::Continue)
    }

    /// Finish the session and hand out the audio.
    ///
    /// Fails with [`TtsError::NoAudio`] if nothing was collected.
    pub fn finish(self, log_id: Option<String>) -> Result<Synthesis> {
        if self.audio.is_empty() {
            return Err(TtsError::NoAudio);
        }
        tracing::info!(
            bytes = self.audio.len(),
            sentences = self.sentences,
            frames = self.frames,
            "Synthesis complete"
        );
        Ok(Synthesis {
            audio: self.audio.freeze(),
            session_id: self.session_id,
            sentences: self.sentences,
            log_id,
        })
    }

    fn append(&mut self, frame: &Frame) {
        self.audio.extend_from_slice(frame.payload());
        tracing::trace!(chunk = frame.payload().len(), total = self.audio.len(), "Audio chunk");
    }
}

fn check_finish_status(payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Ok(());
    }
    let status: Value = match JsonCodec::decode(payload) {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!("Unparsable session finish payload: {}", e);
            return Ok(());
        }
    };
    match status.get("status_code") {
        None | Some(Value::Null) => Ok(()),
        Some(code) if is_success(code) => Ok(()),
        Some(code) => Err(TtsError::SessionFailed {
            status_code: status_code(code),
            message: status_message(&status).unwrap_or_default(),
        }),
    }
}

fn session_failed(payload: &[u8]) -> TtsError {
    match JsonCodec::decode::<Value>(payload) {
        Ok(status) => TtsError::SessionFailed {
            status_code: status.get("status_code").and_then(status_code),
            message: status_message(&status).unwrap_or_else(|| "session failed".to_string()),
        },
        Err(_) => TtsError::SessionFailed {
            status_code: None,
            message: String::from_utf8_lossy(payload).into_owned(),
        },
    }
}

fn is_success(code: &Value) -> bool {
    match code {
        Value::Number(n) => n.as_i64() == Some(STATUS_OK) || n.as_f64() == Some(STATUS_OK as f64),
        Value::String(s) => s.trim().parse::<i64>() == Ok(STATUS_OK),
        _ => false,
    }
}

fn status_code(code: &Value) -> Option<i64> {
    match code {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn status_message(status: &Value) -> Option<String> {
    match status.get("message")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(len: usize, fill: u8) -> Frame {
        Frame::with_session(MessageType::AudioOnlyResponse, events::TTS_RESPONSE, "sess", vec![fill; len])
    }

    fn event(event: u32, payload: &'static [u8]) -> Frame {
        Frame::with_session(MessageType::FullServerResponse, event, "sess", payload)
    }

    #[test]
    fn test_audio_concatenated_in_order() {
        let mut collector = SessionCollector::new();
        assert_eq!(collector.push(audio(3, 1)).unwrap(), Step::Continue);
        assert_eq!(collector.push(audio(2, 2)).unwrap(), Step::Continue);
        assert_eq!(
            collector.push(event(events::SESSION_FINISHED, br#"{"status_code":20000000}"#)).unwrap(),
            Step::Finished
        );

        let synthesis = collector.finish(None).unwrap();
        assert_eq!(&synthesis.audio[..], &[1, 1, 1, 2, 2]);
        assert_eq!(synthesis.session_id.as_deref(), Some("sess"));
    }

    #[test]
    fn test_sentence_events_counted() {
        let mut collector = SessionCollector::new();
        collector.push(event(events::TTS_SENTENCE_START, b"{}")).unwrap();
        collector.push(audio(4, 0)).unwrap();
        collector.push(event(events::TTS_SENTENCE_END, b"{}")).unwrap();
        collector.push(event(events::TTS_SENTENCE_START, b"{}")).unwrap();
        collector.push(audio(4, 0)).unwrap();
        collector.push(event(events::TTS_SENTENCE_END, b"{}")).unwrap();
        collector.push(event(events::SESSION_FINISHED, b"")).unwrap();

        let synthesis = collector.finish(Some("log-1".into())).unwrap();
        assert_eq!(synthesis.sentences, 2);
        assert_eq!(synthesis.len(), 8);
        assert_eq!(synthesis.log_id.as_deref(), Some("log-1"));
    }

    #[test]
    fn test_bare_audio_only_frame_appended() {
        let mut collector = SessionCollector::new();
        collector
            .push(Frame::bare(MessageType::AudioOnlyResponse, vec![9u8; 6]))
            .unwrap();
        assert_eq!(collector.audio_len(), 6);
    }

    #[test]
    fn test_bare_server_response_skipped() {
        let mut collector = SessionCollector::new();
        let step = collector
            .push(Frame::bare(MessageType::FullServerResponse, &b"{}"[..]))
            .unwrap();
        assert_eq!(step, Step::Continue);
        assert_eq!(collector.audio_len(), 0);
    }

    #[test]
    fn test_unknown_event_skipped() {
        let mut collector = SessionCollector::new();
        let step = collector.push(event(4242, b"whatever")).unwrap();
        assert_eq!(step, Step::Continue);
        assert_eq!(collector.audio_len(), 0);
    }

    #[test]
    fn test_error_frame_aborts() {
        let mut collector = SessionCollector::new();
        let result = collector.push(Frame::bare(MessageType::Error, &b"quota exceeded"[..]));
        match result {
            Err(TtsError::Server { message }) => assert_eq!(message, "quota exceeded"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_success_status_fails() {
        let mut collector = SessionCollector::new();
        collector.push(audio(10, 0)).unwrap();
        let result = collector.push(event(
            events::SESSION_FINISHED,
            br#"{"status_code":45000001,"message":"invalid speaker"}"#,
        ));
        match result {
            Err(TtsError::SessionFailed { status_code, message }) => {
                assert_eq!(status_code, Some(45_000_001));
                assert_eq!(message, "invalid speaker");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_success_status_with_structured_message_fails() {
        let mut collector = SessionCollector::new();
        let result = collector.push(event(
            events::SESSION_FINISHED,
            br#"{"status_code":45000000,"message":{"detail":"bad speaker"}}"#,
        ));
        match result {
            Err(TtsError::SessionFailed { status_code, message }) => {
                assert_eq!(status_code, Some(45_000_000));
                assert!(message.contains("bad speaker"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_success_float_status_fails() {
        let mut collector = SessionCollector::new();
        let result = collector.push(event(events::SESSION_FINISHED, br#"{"status_code":45000000.0}"#));
        assert!(matches!(
            result,
            Err(TtsError::SessionFailed {
                status_code: Some(45_000_000),
                ..
            })
        ));
    }

    #[test]
    fn test_success_status_in_other_shapes() {
        for payload in [
            &br#"{"status_code":20000000.0}"#[..],
            &br#"{"status_code":"20000000","extra":[1,2]}"#[..],
            &br#"{"usage":{"text_words":3}}"#[..],
        ] {
            let mut collector = SessionCollector::new();
            assert_eq!(collector.push(event(events::SESSION_FINISHED, payload)).unwrap(), Step::Finished);
        }
    }

    #[test]
    fn test_unparsable_finish_payload_tolerated() {
        let mut collector = SessionCollector::new();
        let step = collector.push(event(events::SESSION_FINISHED, b"not json")).unwrap();
        assert_eq!(step, Step::Finished);
    }

    #[test]
    fn test_session_failed_event() {
        let mut collector = SessionCollector::new();
        let result = collector.push(event(
            events::SESSION_FAILED,
            br#"{"status_code":55000000,"message":"resource ID is mismatched"}"#,
        ));
        assert!(matches!(
            result,
            Err(TtsError::SessionFailed {
                status_code: Some(55_000_000),
                ..
            })
        ));
    }

    #[test]
    fn test_finish_without_audio() {
        let collector = SessionCollector::new();
        assert!(matches!(collector.finish(None), Err(TtsError::NoAudio)));
    }

    #[tokio::test]
    async fn test_save_writes_audio() {
        let synthesis = Synthesis {
            audio: Bytes::from_static(b"RIFF....WAVE"),
            session_id: None,
            sentences: 1,
            log_id: None,
        };
        let path = std::env::temp_dir().join(format!("doubao-tts-{}.wav", std::process::id()));

        synthesis.save(&path).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"RIFF....WAVE");
        let _ = tokio::fs::remove_file(&path).await;
    }
}
