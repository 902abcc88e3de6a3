//! Synthesis request body.
//!
//! A [`SynthesisRequest`] is turned into the JSON document carried by the
//! single client request frame:
//!
//! ```text
//! {"user":{"uid":..},"req_params":{"text":..,"speaker":..,"audio_params":{..},"additions":"{..}"}}
//! ```
//!
//! `additions` is itself a JSON document, sent as a string.

use serde::Serialize;

use crate::codec::JsonCodec;
use crate::config::TtsConfig;
use crate::error::Result;

/// Default emotion intensity.
pub const DEFAULT_EMOTION_SCALE: u8 = 4;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Output audio container/codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// RIFF/WAVE.
    #[default]
    Wav,
    /// MPEG layer 3.
    Mp3,
    /// Raw PCM.
    Pcm,
    /// Opus in Ogg.
    OggOpus,
}

impl AudioFormat {
    /// File extension for saved audio.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Pcm => "pcm",
            AudioFormat::OggOpus => "ogg",
        }
    }
}

/// One text-to-speech request.
#[derive(Debug, Clone, Default)]
pub struct SynthesisRequest {
    text: String,
    speaker: Option<String>,
    format: AudioFormat,
    sample_rate: Option<u32>,
    speech_rate: Option<i32>,
    loudness_rate: Option<i32>,
    bit_rate: Option<u32>,
    emotion: Option<(String, u8)>,
    context_texts: Vec<String>,
    section_id: Option<String>,
    enable_timestamp: bool,
    silence_duration: Option<u32>,
    enable_language_detector: bool,
    disable_markdown_filter: bool,
    explicit_language: Option<String>,
    use_cache: bool,
}

impl SynthesisRequest {
    /// Create a request for `text` with default audio parameters (WAV, 24 kHz).
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Text to synthesize.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Requested output format.
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Use a specific voice instead of the configured default.
    pub fn speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Set the output format.
    pub fn audio_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the sample rate in Hz.
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Speech rate, -50..=100 (0 is normal).
    pub fn speech_rate(mut self, rate: i32) -> Self {
        self.speech_rate = Some(rate);
        self
    }

    /// Loudness, -50..=100 (0 is normal).
    pub fn loudness_rate(mut self, rate: i32) -> Self {
        self.loudness_rate = Some(rate);
        self
    }

    /// MP3 bit rate. Ignored for other formats.
    pub fn bit_rate(mut self, rate: u32) -> Self {
        self.bit_rate = Some(rate);
        self
    }

    /// Emotion with the default scale of 4.
    pub fn emotion(self, emotion: impl Into<String>) -> Self {
        self.emotion_with_scale(emotion, DEFAULT_EMOTION_SCALE)
    }

    /// Emotion with an explicit scale (1..=5).
    pub fn emotion_with_scale(mut self, emotion: impl Into<String>, scale: u8) -> Self {
        self.emotion = Some((emotion.into(), scale));
        self
    }

    /// Preceding dialogue used to shape prosody (seed-tts-2.0 only).
    pub fn context_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_texts = texts.into_iter().map(Into::into).collect();
        self
    }

    /// Section id linking consecutive requests (seed-tts-2.0 only).
    pub fn section_id(mut self, id: impl Into<String>) -> Self {
        self.section_id = Some(id.into());
        self
    }

    /// Ask the server for word timestamps.
    pub fn enable_timestamp(mut self) -> Self {
        self.enable_timestamp = true;
        self
    }

    /// Trailing silence in milliseconds.
    pub fn silence_duration(mut self, ms: u32) -> Self {
        self.silence_duration = Some(ms);
        self
    }

    /// Let the server detect the text language.
    pub fn enable_language_detector(mut self) -> Self {
        self.enable_language_detector = true;
        self
    }

    /// Read markdown syntax literally.
    pub fn disable_markdown_filter(mut self) -> Self {
        self.disable_markdown_filter = true;
        self
    }

    /// Force the text language, e.g. `ja` or `zh-cn`.
    pub fn explicit_language(mut self, language: impl Into<String>) -> Self {
        self.explicit_language = Some(language.into());
        self
    }

    /// Allow the server to answer from its synthesis cache.
    pub fn use_cache(mut self) -> Self {
        self.use_cache = true;
        self
    }

    /// Encode the JSON payload for the client request frame.
    pub fn payload(&self, config: &TtsConfig) -> Result<Vec<u8>> {
        let additions = self.additions(config)?;
        let body = RequestBody {
            user: User {
                uid: &config.user_uid,
            },
            req_params: ReqParams {
                text: &self.text,
                speaker: self.speaker.as_deref().unwrap_or(&config.voice_type),
                audio_params: self.audio_params(),
                additions,
            },
        };
        JsonCodec::encode(&body)
    }

    fn audio_params(&self) -> AudioParams<'_> {
        let (emotion, emotion_scale) = match &self.emotion {
            Some((emotion, scale)) => (Some(emotion.as_str()), Some(*scale)),
            None => (None, None),
        };
        AudioParams {
            format: self.format,
            sample_rate: self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
            speech_rate: self.speech_rate,
            loudness_rate: self.loudness_rate,
            bit_rate: self.bit_rate.filter(|_| self.format == AudioFormat::Mp3),
            emotion,
            emotion_scale,
        }
    }

    fn additions(&self, config: &TtsConfig) -> Result<Option<String>> {
        let tts_2_0 = config.is_tts_2_0();
        if !tts_2_0 && (!self.context_texts.is_empty() || self.section_id.is_some()) {
            tracing::warn!(
                resource_id = %config.resource_id,
                "context texts and section id need seed-tts-2.0, dropping them"
            );
        }

        let additions = Additions {
            context_texts: Some(&self.context_texts)
                .filter(|texts| tts_2_0 && !texts.is_empty()),
            section_id: self.section_id.as_deref().filter(|_| tts_2_0),
            enable_timestamp: self.enable_timestamp.then_some(true),
            silence_duration: self.silence_duration.filter(|ms| *ms > 0),
            enable_language_detector: self.enable_language_detector.then_some(true),
            disable_markdown_filter: self.disable_markdown_filter.then_some(true),
            explicit_language: self.explicit_language.as_deref(),
            cache_config: self.use_cache.then_some(CacheConfig {
                text_type: 1,
                use_cache: true,
            }),
        };

        if additions.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string(&additions)?))
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    user: User<'a>,
    req_params: ReqParams<'a>,
}

#[derive(Serialize)]
struct User<'a> {
    uid: &'a str,
}

#[derive(Serialize)]
struct ReqParams<'a> {
    text: &'a str,
    speaker: &'a str,
    audio_params: AudioParams<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    additions: Option<String>,
}

#[derive(Serialize)]
struct AudioParams<'a> {
    format: AudioFormat,
    sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_rate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loudness_rate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion_scale: Option<u8>,
}

#[derive(Serialize)]
struct Additions<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    context_texts: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    section_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_timestamp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    silence_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_language_detector: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disable_markdown_filter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explicit_language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_config: Option<CacheConfig>,
}

impl Additions<'_> {
    fn is_empty(&self) -> bool {
        self.context_texts.is_none()
            && self.section_id.is_none()
            && self.enable_timestamp.is_none()
            && self.silence_duration.is_none()
            && self.enable_language_detector.is_none()
            && self.disable_markdown_filter.is_none()
            && self.explicit_language.is_none()
            && self.cache_config.is_none()
    }
}

#[derive(Serialize)]
struct CacheConfig {
    text_type: u8,
    use_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RESOURCE_TTS_2_0;
    use serde_json::{json, Value};

    fn config(resource_id: &str) -> TtsConfig {
        TtsConfig::builder("app", "token")
            .resource_id(resource_id)
            .build()
            .unwrap()
    }

    fn body(req: &SynthesisRequest, config: &TtsConfig) -> Value {
        serde_json::from_slice(&req.payload(config).unwrap()).unwrap()
    }

    #[test]
    fn test_minimal_body() {
        let config = config("seed-tts-1.0");
        let value = body(&SynthesisRequest::new("你好世界"), &config);

        assert_eq!(
            value,
            json!({
                "user": {"uid": "test_user_001"},
                "req_params": {
                    "text": "你好世界",
                    "speaker": "zh_female_vv_uranus_bigtts",
                    "audio_params": {"format": "wav", "sample_rate": 24000}
                }
            })
        );
    }

    #[test]
    fn test_payload_keeps_utf8_raw() {
        let config = config("seed-tts-1.0");
        let payload = SynthesisRequest::new("こんにちは").payload(&config).unwrap();
        assert!(std::str::from_utf8(&payload).unwrap().contains("こんにちは"));
    }

    #[test]
    fn test_speaker_and_audio_params() {
        let config = config("seed-tts-1.0");
        let req = SynthesisRequest::new("hi")
            .speaker("ja_male_voice")
            .audio_format(AudioFormat::Mp3)
            .sample_rate(16_000)
            .speech_rate(10)
            .loudness_rate(-5)
            .bit_rate(128_000)
            .emotion("happy");
        let params = &body(&req, &config)["req_params"];

        assert_eq!(params["speaker"], "ja_male_voice");
        assert_eq!(
            params["audio_params"],
            json!({
                "format": "mp3",
                "sample_rate": 16000,
                "speech_rate": 10,
                "loudness_rate": -5,
                "bit_rate": 128000,
                "emotion": "happy",
                "emotion_scale": 4
            })
        );
    }

    #[test]
    fn test_bit_rate_only_for_mp3() {
        let config = config("seed-tts-1.0");
        let req = SynthesisRequest::new("hi").bit_rate(64_000);
        let params = &body(&req, &config)["req_params"]["audio_params"];
        assert!(params.get("bit_rate").is_none());
    }

    #[test]
    fn test_context_texts_require_tts_2_0() {
        let req = SynthesisRequest::new("hi")
            .context_texts(["前面的对话"])
            .section_id("sec-1");

        let v1 = body(&req, &config("seed-tts-1.0"));
        assert!(v1["req_params"].get("additions").is_none());

        let v2 = body(&req, &config(RESOURCE_TTS_2_0));
        let additions: Value =
            serde_json::from_str(v2["req_params"]["additions"].as_str().unwrap()).unwrap();
        assert_eq!(
            additions,
            json!({"context_texts": ["前面的对话"], "section_id": "sec-1"})
        );
    }

    #[test]
    fn test_other_additions() {
        let req = SynthesisRequest::new("hi")
            .enable_timestamp()
            .silence_duration(500)
            .enable_language_detector()
            .disable_markdown_filter()
            .explicit_language("ja")
            .use_cache();
        let value = body(&req, &config("seed-tts-1.0"));
        let additions: Value =
            serde_json::from_str(value["req_params"]["additions"].as_str().unwrap()).unwrap();

        assert_eq!(
            additions,
            json!({
                "enable_timestamp": true,
                "silence_duration": 500,
                "enable_language_detector": true,
                "disable_markdown_filter": true,
                "explicit_language": "ja",
                "cache_config": {"text_type": 1, "use_cache": true}
            })
        );
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(AudioFormat::Wav.extension(), "wav");
        assert_eq!(AudioFormat::OggOpus.extension(), "ogg");
        assert_eq!(SynthesisRequest::new("x").format(), AudioFormat::Wav);
    }
}
