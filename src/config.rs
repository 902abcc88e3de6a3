//! Connection configuration.
//!
//! All credentials and defaults live in one [`TtsConfig`] value that is handed
//! to [`Synthesizer::new`](crate::Synthesizer::new). Nothing else in the crate
//! reads the environment.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use doubao_tts::TtsConfig;
//!
//! let config = TtsConfig::builder("app-id", "access-token")
//!     .resource_id("seed-tts-2.0")
//!     .read_timeout(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.resource_id, "seed-tts-2.0");
//! ```

use std::fmt;
use std::time::Duration;

use crate::error::{Result, TtsError};

/// Default unidirectional streaming endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://openspeech.bytedance.com/api/v3/tts/unidirectional/stream";

/// Default resource id.
pub const DEFAULT_RESOURCE_ID: &str = "seed-tts-1.0";

/// Resource id of the 2.0 model, the only one accepting context texts.
pub const RESOURCE_TTS_2_0: &str = "seed-tts-2.0";

/// Default voice.
pub const DEFAULT_VOICE_TYPE: &str = "zh_female_vv_uranus_bigtts";

/// Default user uid sent in every request.
pub const DEFAULT_USER_UID: &str = "test_user_001";

/// Default per-read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum inbound WebSocket message size (10 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Environment variable names read by [`TtsConfig::from_env`].
pub mod env_vars {
    /// Application id (required).
    pub const APP_ID: &str = "VOLCENGINE_APP_ID";
    /// Access token (required).
    pub const ACCESS_TOKEN: &str = "VOLCENGINE_ACCESS_TOKEN";
    /// Resource id.
    pub const RESOURCE_ID: &str = "TTS_V3_RESOURCE_ID";
    /// Default voice.
    pub const VOICE_TYPE: &str = "VOLCENGINE_VOICE_TYPE";
    /// Endpoint override.
    pub const ENDPOINT: &str = "TTS_V3_ENDPOINT";
}

/// Configuration for a synthesis connection.
#[derive(Clone)]
pub struct TtsConfig {
    /// `X-Api-App-Id`.
    pub app_id: String,
    /// `X-Api-Access-Key`.
    pub access_token: String,
    /// `X-Api-Resource-Id`.
    pub resource_id: String,
    /// Voice used when a request does not name a speaker.
    pub voice_type: String,
    /// WebSocket URL.
    pub endpoint: String,
    /// How long to wait for each inbound frame.
    pub read_timeout: Duration,
    /// Largest inbound message accepted by the transport.
    pub max_message_size: usize,
    /// `user.uid` in the request body.
    pub user_uid: String,
}

impl TtsConfig {
    /// Create a builder with the given credentials and default settings.
    pub fn builder(app_id: impl Into<String>, access_token: impl Into<String>) -> TtsConfigBuilder {
        TtsConfigBuilder::new(app_id, access_token)
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (app_id, access_token) = match (get(env_vars::APP_ID), get(env_vars::ACCESS_TOKEN)) {
            (Some(app_id), Some(token)) => (app_id, token),
            _ => {
                return Err(TtsError::Config(format!(
                    "{} and {} must be set",
                    env_vars::APP_ID,
                    env_vars::ACCESS_TOKEN
                )))
            }
        };

        let mut builder = TtsConfigBuilder::new(app_id, access_token);
        if let Some(resource_id) = get(env_vars::RESOURCE_ID) {
            builder = builder.resource_id(resource_id);
        }
        if let Some(voice) = get(env_vars::VOICE_TYPE) {
            builder = builder.voice_type(voice);
        }
        if let Some(endpoint) = get(env_vars::ENDPOINT) {
            builder = builder.endpoint(endpoint);
        }
        builder.build()
    }

    /// Whether the configured resource is the 2.0 model.
    pub fn is_tts_2_0(&self) -> bool {
        self.resource_id == RESOURCE_TTS_2_0
    }
}

impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsConfig")
            .field("app_id", &self.app_id)
            .field("access_token", &"<redacted>")
            .field("resource_id", &self.resource_id)
            .field("voice_type", &self.voice_type)
            .field("endpoint", &self.endpoint)
            .field("read_timeout", &self.read_timeout)
            .field("max_message_size", &self.max_message_size)
            .field("user_uid", &self.user_uid)
            .finish()
    }
}

/// Builder for [`TtsConfig`].
pub struct TtsConfigBuilder {
    config: TtsConfig,
}

impl TtsConfigBuilder {
    /// Create a new builder.
    pub fn new(app_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            config: TtsConfig {
                app_id: app_id.into(),
                access_token: access_token.into(),
                resource_id: DEFAULT_RESOURCE_ID.to_string(),
                voice_type: DEFAULT_VOICE_TYPE.to_string(),
                endpoint: DEFAULT_ENDPOINT.to_string(),
                read_timeout: DEFAULT_READ_TIMEOUT,
                max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
                user_uid: DEFAULT_USER_UID.to_string(),
            },
        }
    }

    /// Set the resource id.
    ///
    /// Default: `seed-tts-1.0`
    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.config.resource_id = resource_id.into();
        self
    }

    /// Set the default voice.
    pub fn voice_type(mut self, voice_type: impl Into<String>) -> Self {
        self.config.voice_type = voice_type.into();
        self
    }

    /// Set the WebSocket endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the per-read timeout.
    ///
    /// Default: 30 seconds
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the maximum inbound message size.
    ///
    /// Default: 10 MiB
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Set the user uid sent with each request.
    pub fn user_uid(mut self, uid: impl Into<String>) -> Self {
        self.config.user_uid = uid.into();
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<TtsConfig> {
        let config = self.config;
        if config.app_id.is_empty() || config.access_token.is_empty() {
            return Err(TtsError::Config("app id and access token are required".to_string()));
        }
        if config.read_timeout.is_zero() {
            return Err(TtsError::Config("read timeout must be non-zero".to_string()));
        }
        if !(config.endpoint.starts_with("ws://") || config.endpoint.starts_with("wss://")) {
            return Err(TtsError::Config(format!(
                "endpoint must be a ws:// or wss:// URL, got {}",
                config.endpoint
            )));
        }
        Ok(config)
    }
}
