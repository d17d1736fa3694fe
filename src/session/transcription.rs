//! # Transcription Session
//!
//! The core state machine of a real-time streaming transcription session.
//!
//! ## Session Lifecycle:
//! 1. **Init**: connection accepted, CONNECTED event queued, capture started
//! 2. **Streaming**: the request pump forwards audio frames from the hand-off
//!    queue to the recognizer while the response consumer classifies each
//!    incoming result and emits transcript events
//! 3. **Draining**: on end of stream, cancellation, or a fatal error the
//!    session stops and joins audio capture (bounded), then emits exactly one
//!    terminal event (COMPLETE, or ERROR with a message)
//! 4. **Closed**: the connection handler removes the registry entry
//!
//! ## Cancellation:
//! All loops wait with short timeouts (300 to 500 ms) and re-poll, so the shared
//! cancellation signal is observed at sub-second granularity. Cancellation may
//! be requested any number of times from any unit; draining and the terminal
//! send each happen at most once.

use crate::audio::{AudioFrame, CaptureHandle, CAPTURE_JOIN_TIMEOUT};
use crate::gateway::recognizer::{RecognitionResult, RecognitionStream, SpeechRecognizer};
use crate::gateway::translation::{translate_or_marker, TranslationGateway};
use crate::session::cancel::CancelSignal;
use crate::session::events::{EventEmitter, TranscriptEvent};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};

/// Interim results whose transcript length moved by no more than this many
/// characters since the last translated transcript skip the translation call.
/// Amortizes translation cost against transcript churn.
pub const TRANSLATE_LENGTH_DELTA: usize = 10;

/// How long the request pump waits for an audio frame before re-checking the
/// cancellation signal.
const FRAME_POLL_TIMEOUT: Duration = Duration::from_millis(300);

/// How long the response consumer waits for a recognition result before
/// re-checking the cancellation signal.
const RESULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Classification rule for incurring a translation call.
///
/// Final results always translate. Interim results translate only when their
/// length differs from the last translated transcript by more than
/// [`TRANSLATE_LENGTH_DELTA`] characters.
pub fn translate_worthy(result: &RecognitionResult, last_transcript: &str) -> bool {
    if result.is_final {
        return true;
    }
    let delta = result
        .transcript
        .chars()
        .count()
        .abs_diff(last_transcript.chars().count());
    delta > TRANSLATE_LENGTH_DELTA
}

/// Idempotent "terminal already sent" latch.
///
/// Every exit path of [`TranscriptionSession::run`] funnels its terminal
/// event through this guard, so a session emits at most one COMPLETE or
/// ERROR even when drain paths race. The latch is set before the send: a
/// failed terminal send is not retried on another path.
#[derive(Debug, Default)]
struct TerminalGuard {
    sent: bool,
}

impl TerminalGuard {
    fn send(&mut self, emitter: &EventEmitter, event: TranscriptEvent) {
        debug_assert!(event.is_terminal());
        if self.sent {
            return;
        }
        self.sent = true;
        emitter.send(&event);
    }
}

/// One streaming transcription session. Owned exclusively by its connection
/// handler; never outlives the connection.
pub struct TranscriptionSession {
    connection_id: String,
    /// Language the recognizer transcribes in.
    recognition_language: String,
    /// Language translations are produced in.
    target_language: String,
    translator: Arc<dyn TranslationGateway>,
    cancel: CancelSignal,
    last_transcript: String,
}

impl TranscriptionSession {
    pub fn new(
        connection_id: impl Into<String>,
        recognition_language: impl Into<String>,
        target_language: impl Into<String>,
        translator: Arc<dyn TranslationGateway>,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            recognition_language: recognition_language.into(),
            target_language: target_language.into(),
            translator,
            cancel,
            last_transcript: String::new(),
        }
    }

    /// Drive the session to completion.
    ///
    /// Consumes `frames` (the audio hand-off queue), streams through
    /// `recognizer`, and emits events through `emitter`. On every exit path
    /// the session drains: capture is stopped and joined with a bounded
    /// timeout, and exactly one terminal event is emitted.
    pub async fn run(
        mut self,
        frames: mpsc::Receiver<AudioFrame>,
        recognizer: &dyn SpeechRecognizer,
        capture: Option<CaptureHandle>,
        emitter: &EventEmitter,
    ) {
        info!(
            "Starting {} speech recognition for {} with translation to {}",
            self.recognition_language, self.connection_id, self.target_language
        );

        let outcome = self.stream(frames, recognizer, emitter).await;

        // Draining: release the microphone before concluding with the client.
        // The join blocks, so it runs on the blocking pool.
        self.cancel.request_stop();
        if let Some(capture) = capture {
            let _ = tokio::task::spawn_blocking(move || capture.stop(CAPTURE_JOIN_TIMEOUT)).await;
        }

        let mut terminal = TerminalGuard::default();
        match outcome {
            Ok(()) => terminal.send(emitter, TranscriptEvent::complete()),
            Err(err) => {
                error!("Error in speech recognition or translation: {}", err);
                terminal.send(emitter, TranscriptEvent::error(err.to_string()));
            }
        }

        info!("Session drained: {}", self.connection_id);
    }

    /// Streaming phase: pump requests, consume and classify responses.
    ///
    /// Returns `Ok` on a normal end of stream or cancellation; `Err` only for
    /// a fatal recognizer failure.
    async fn stream(
        &mut self,
        frames: mpsc::Receiver<AudioFrame>,
        recognizer: &dyn SpeechRecognizer,
        emitter: &EventEmitter,
    ) -> Result<()> {
        let RecognitionStream {
            audio_tx,
            mut results_rx,
        } = recognizer.start_stream(&self.recognition_language).await?;

        let pump = spawn_request_pump(frames, audio_tx, self.cancel.clone());

        let outcome = loop {
            if self.cancel.is_stop_requested() {
                info!("Stop requested during response processing");
                break Ok(());
            }

            match timeout(RESULT_POLL_TIMEOUT, results_rx.recv()).await {
                Err(_) => continue, // no result yet, re-check cancellation
                Ok(None) => {
                    debug!("Recognition stream ended");
                    break Ok(());
                }
                Ok(Some(Err(err))) => break Err(err),
                Ok(Some(Ok(result))) => self.handle_result(result, emitter).await,
            }
        };

        // Quiesce the pump before the terminal event: it observes the stop
        // request within one frame poll interval.
        self.cancel.request_stop();
        if timeout(FRAME_POLL_TIMEOUT * 2, pump).await.is_err() {
            debug!("Request pump still draining at session close");
        }

        outcome
    }

    /// Classify one result, translating when it is translate-worthy, and emit
    /// the corresponding transcript event.
    async fn handle_result(&mut self, result: RecognitionResult, emitter: &EventEmitter) {
        let event = if translate_worthy(&result, &self.last_transcript) {
            let translation = translate_or_marker(
                self.translator.as_ref(),
                &result.transcript,
                &self.target_language,
            )
            .await;
            self.last_transcript = result.transcript.clone();

            if result.is_final {
                TranscriptEvent::Final {
                    original: result.transcript,
                    translation,
                    is_final: true,
                }
            } else {
                TranscriptEvent::Interim {
                    original: result.transcript,
                    translation: Some(translation),
                    is_final: false,
                }
            }
        } else {
            // Keep the client UI responsive without a translation call
            TranscriptEvent::Interim {
                original: result.transcript,
                translation: None,
                is_final: false,
            }
        };

        // A failed send marks the session stopped; the stream loop observes
        // that on its next iteration.
        emitter.send(&event);
    }
}

/// Forward audio frames from the hand-off queue to the recognizer's request
/// side until cancellation, end of capture, or the recognizer closing.
///
/// Waits at most [`FRAME_POLL_TIMEOUT`] per frame and re-polls on empty, so
/// an idle microphone never delays shutdown.
fn spawn_request_pump(
    mut frames: mpsc::Receiver<AudioFrame>,
    audio_tx: mpsc::Sender<AudioFrame>,
    cancel: CancelSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel.is_stop_requested() {
                break;
            }
            match timeout(FRAME_POLL_TIMEOUT, frames.recv()).await {
                Err(_) => continue, // queue empty, re-check cancellation
                Ok(None) => break,  // capture side closed
                Ok(Some(frame)) => {
                    if audio_tx.send(frame).await.is_err() {
                        debug!("Recognizer closed its request side");
                        break;
                    }
                }
            }
        }
        debug!("Request generator ended");
    })
}
