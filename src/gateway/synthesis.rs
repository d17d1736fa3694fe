//! # Speech Synthesis Gateway
//!
//! Request/response façade to the cloud text-to-speech service, used by the
//! HTTP TTS endpoints. Unlike translation this path is not fail-soft: a
//! synthesis failure surfaces to the HTTP caller as an error response.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Cloud text-to-speech service boundary.
#[async_trait]
pub trait SynthesisGateway: Send + Sync {
    /// Synthesize `text` in `language_code`, returning encoded audio bytes
    /// (MP3).
    async fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    language_code: &'a str,
    audio_encoding: &'a str,
    voice_gender: &'a str,
}

/// Synthesis over the cloud service's HTTP API. The response body carries the
/// encoded audio directly.
#[derive(Clone)]
pub struct RemoteSynthesizer {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl RemoteSynthesizer {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SynthesisGateway for RemoteSynthesizer {
    async fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>> {
        info!("Generating speech for language: {}", language_code);

        let url = format!("{}/v1/synthesize", self.base_url);
        let mut request = self.http.post(&url).json(&SynthesizeRequest {
            text,
            language_code,
            audio_encoding: "MP3",
            voice_gender: "NEUTRAL",
        });

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Synthesis service returned {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
