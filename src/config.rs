//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration file (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, ...)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! `HOST` and `PORT` are also honored without the prefix because deployment
//! platforms commonly set them directly.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub speech: SpeechConfig,
    pub translation: TranslationConfig,
    pub synthesis: SynthesisConfig,
    pub storage: StorageConfig,
}

/// Server bind settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Capture-side settings.
///
/// Sample rate, channel count and frame size are fixed by the recognizer
/// contract (16 kHz mono, 100 ms frames) and live as constants in the audio
/// module; only the queue bound is tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capacity of the capture-to-recognizer hand-off queue, in frames.
    /// Bounds memory when the recognizer stalls; overflow drops frames.
    pub queue_capacity: usize,
}

/// Streaming speech-recognition service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// WebSocket endpoint of the streaming recognizer.
    pub recognizer_url: String,
    pub api_key: Option<String>,
    /// Language the recognizer transcribes in (not the translation target).
    pub recognition_language: String,
}

/// Translation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    pub service_url: String,
    pub api_key: Option<String>,
    /// Target language used when the client supplies none.
    pub default_target_language: String,
}

/// Text-to-speech service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub service_url: String,
    pub api_key: Option<String>,
}

/// Artifact storage settings.
///
/// ## Backends:
/// - `"local"`: files under `static_dir`, served back as `/static/...` URLs
/// - `"cloud"`: HTTP-addressed bucket at `bucket_url`, served from
///   `public_base_url` when set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: String,
    pub static_dir: String,
    pub bucket_url: String,
    pub public_base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            audio: AudioConfig {
                queue_capacity: 32, // ~3 seconds of audio at 100 ms per frame
            },
            speech: SpeechConfig {
                recognizer_url: "wss://speech.example.com/v1/stream".to_string(),
                api_key: None,
                recognition_language: "en-US".to_string(),
            },
            translation: TranslationConfig {
                service_url: "https://translate.example.com".to_string(),
                api_key: None,
                default_target_language: "en-US".to_string(),
            },
            synthesis: SynthesisConfig {
                service_url: "https://tts.example.com".to_string(),
                api_key: None,
            },
            storage: StorageConfig {
                backend: "local".to_string(),
                static_dir: "static".to_string(),
                bucket_url: String::new(),
                public_base_url: None,
                api_key: None,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms set these without the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved and can't be bound)
    /// - The frame queue has room for at least one frame
    /// - The recognizer endpoint is set
    /// - The storage backend names one of the two implementations, and the
    ///   cloud backend carries a bucket URL
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.audio.queue_capacity == 0 {
            return Err(anyhow::anyhow!("Audio queue capacity must be greater than 0"));
        }

        if self.speech.recognizer_url.is_empty() {
            return Err(anyhow::anyhow!("Speech recognizer URL must be set"));
        }

        match self.storage.backend.as_str() {
            "local" => {}
            "cloud" => {
                if self.storage.bucket_url.is_empty() {
                    return Err(anyhow::anyhow!(
                        "Cloud storage backend requires storage.bucket_url"
                    ));
                }
            }
            other => {
                return Err(anyhow::anyhow!("Unknown storage backend: {}", other));
            }
        }

        Ok(())
    }
}
