//! # Streaming Speech Recognizer
//!
//! Trait seam for the cloud streaming-recognition service plus the remote
//! WebSocket-backed implementation.
//!
//! ## Streaming Contract:
//! `start_stream` opens one recognition session and returns a pair of
//! channels: a sender for PCM audio frames (the request side) and a receiver
//! of recognition results (the response side). Results for an utterance
//! arrive in non-decreasing finality: interim transcripts first, then the
//! final transcript that concludes the utterance. The response channel
//! closing marks the end of the stream; an `Err` item marks a fatal stream
//! failure.

use crate::audio::AudioFrame;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// In-flight channel capacity for both directions of a recognition stream.
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// One transcript hypothesis from the recognizer. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

/// A live recognition session.
pub struct RecognitionStream {
    /// Request side: audio frames, in capture order.
    pub audio_tx: mpsc::Sender<AudioFrame>,
    /// Response side: results until the stream ends, or a single fatal error.
    pub results_rx: mpsc::Receiver<Result<RecognitionResult>>,
}

/// Streaming speech-recognition service boundary.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Open a streaming recognition session for `language_code`.
    async fn start_stream(&self, language_code: &str) -> Result<RecognitionStream>;
}

/// Result frame as the remote service puts it on the wire.
#[derive(Debug, Deserialize)]
struct WireResult {
    transcript: String,
    #[serde(default)]
    is_final: bool,
}

impl From<WireResult> for RecognitionResult {
    fn from(wire: WireResult) -> Self {
        Self {
            transcript: wire.transcript,
            is_final: wire.is_final,
        }
    }
}

/// Recognizer backed by a cloud streaming endpoint: binary PCM frames go up,
/// JSON result frames come down, over one WebSocket per session.
pub struct RemoteRecognizer {
    url: String,
    api_key: Option<String>,
}

impl RemoteRecognizer {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
        }
    }

    fn session_url(&self, language_code: &str) -> String {
        let mut url = format!(
            "{}?language={}&sample_rate=16000&interim_results=true",
            self.url, language_code
        );
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }
        url
    }
}

#[async_trait]
impl SpeechRecognizer for RemoteRecognizer {
    async fn start_stream(&self, language_code: &str) -> Result<RecognitionStream> {
        let url = self.session_url(language_code);
        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to recognizer at {}", self.url))?;
        debug!("Recognizer stream opened: {}", url);

        let (mut write, mut read) = socket.split();
        let (audio_tx, mut audio_rx) = mpsc::channel::<AudioFrame>(STREAM_CHANNEL_CAPACITY);
        let (result_tx, results_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        // Uplink: forward frames until the session closes its sender, then
        // tell the service the utterance is over.
        tokio::spawn(async move {
            while let Some(frame) = audio_rx.recv().await {
                if let Err(err) = write.send(Message::Binary(frame.into_bytes())).await {
                    warn!("Recognizer uplink closed: {}", err);
                    return;
                }
            }
            let _ = write.send(Message::Close(None)).await;
            info!("Recognizer uplink ended");
        });

        // Downlink: parse result frames; a transport error is fatal to the
        // stream and surfaces as a single Err item.
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<WireResult>(&text) {
                        Ok(wire) => {
                            if result_tx.send(Ok(wire.into())).await.is_err() {
                                return; // session already gone
                            }
                        }
                        Err(err) => debug!("Ignoring unparsable recognizer frame: {}", err),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        let _ = result_tx
                            .send(Err(anyhow!("Recognizer stream failed: {}", err)))
                            .await;
                        return;
                    }
                }
            }
            info!("Recognizer stream ended");
        });

        Ok(RecognitionStream {
            audio_tx,
            results_rx,
        })
    }
}
