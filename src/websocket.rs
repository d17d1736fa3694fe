//! # WebSocket Transcription Handler
//!
//! Real-time transcription sessions live at `/ws/transcribe`. Each connection
//! is one actor owning one [`TranscriptionSession`] pipeline: server-side
//! microphone capture feeds the streaming recognizer, recognition results are
//! classified and (when worthy) translated, and transcript events flow back
//! to the client as JSON text frames.
//!
//! ## Protocol:
//! 1. **Connect**: `GET /ws/transcribe?language=es-ES` (target language
//!    defaults from configuration)
//! 2. **First frame**: `{"status":"connected","connection_id":...}`
//! 3. **Streaming**: INTERIM / FINAL transcript events
//! 4. **Stop**: client sends `{"command":"stop"}`, server acknowledges with
//!    STOPPING and drains
//! 5. **Terminal**: exactly one COMPLETE or ERROR, then the server closes
//!
//! Client text frames that are not a stop command are ignored, as are binary
//! frames (audio is captured server-side). All server writes funnel through
//! the actor mailbox via [`EventEmitter`], so drain notifications and
//! transcript events never interleave.

use crate::audio::AudioSource;
use crate::session::{CancelSignal, EventEmitter, EventSink, TranscriptEvent, TranscriptionSession};
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TranscribeQuery {
    /// Target language tag for translation, e.g. "es-ES".
    pub language: Option<String>,
}

/// HTTP entry point: upgrade to a WebSocket transcription session.
pub async fn transcribe_ws(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<TranscribeQuery>,
) -> ActixResult<HttpResponse> {
    let target_language = match &query.language {
        Some(language) if !language.is_empty() => language.clone(),
        _ => state.get_config().translation.default_target_language,
    };

    let actor = TranscribeWebSocket::new(state, target_language);
    ws::start(actor, &req, stream)
}

/// Recognize the single supported control frame, `{"command":"stop"}`.
/// Anything unparsable or unrecognized is not a stop.
fn is_stop_command(text: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => value.get("command").and_then(|c| c.as_str()) == Some("stop"),
        Err(_) => false,
    }
}

/// Text frame queued onto the actor mailbox by the session pipeline.
#[derive(Message)]
#[rtype(result = "()")]
struct SendText(String);

/// Notification that the session pipeline has fully drained.
#[derive(Message)]
#[rtype(result = "()")]
struct PipelineDone;

/// [`EventSink`] over the actor mailbox. `try_send` fails once the actor is
/// stopping or its mailbox is gone, which the emitter converts into session
/// cancellation.
struct ActorSink {
    addr: Addr<TranscribeWebSocket>,
}

impl EventSink for ActorSink {
    fn write(&self, payload: String) -> bool {
        self.addr.try_send(SendText(payload)).is_ok()
    }
}

/// WebSocket actor for one transcription session.
pub struct TranscribeWebSocket {
    connection_id: String,
    target_language: String,
    state: web::Data<AppState>,
    cancel: CancelSignal,
    emitter: Option<EventEmitter>,
}

impl TranscribeWebSocket {
    pub fn new(state: web::Data<AppState>, target_language: String) -> Self {
        Self {
            connection_id: Uuid::new_v4().to_string(),
            target_language,
            state,
            cancel: CancelSignal::new(),
            emitter: None,
        }
    }

    /// Start the capture → recognize → translate pipeline on the runtime.
    /// The actor keeps handling client frames while the pipeline runs.
    fn spawn_pipeline(&self, emitter: EventEmitter, addr: Addr<TranscribeWebSocket>) {
        let connection_id = self.connection_id.clone();
        let target_language = self.target_language.clone();
        let cancel = self.cancel.clone();
        let recognizer = self.state.recognizer.clone();
        let translator = self.state.translator.clone();
        let config = self.state.get_config();
        let recognition_language = config.speech.recognition_language;
        let queue_capacity = config.audio.queue_capacity;

        tokio::spawn(async move {
            let (frame_tx, frame_rx) = mpsc::channel(queue_capacity);

            // A session with a broken microphone still runs its shutdown path
            let capture = match AudioSource::start(frame_tx, cancel.clone()) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    error!("Failed to start audio capture: {}", err);
                    None
                }
            };

            let session = TranscriptionSession::new(
                connection_id.clone(),
                recognition_language,
                target_language,
                translator,
                cancel.clone(),
            );
            session
                .run(frame_rx, recognizer.as_ref(), capture, &emitter)
                .await;

            // Terminal event delivered (or undeliverable); nothing more may
            // be written on this connection.
            cancel.mark_stopped();
            addr.do_send(PipelineDone);
        });
    }
}

impl Actor for TranscribeWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            connection_id = %self.connection_id,
            target_language = %self.target_language,
            "Transcription session connected"
        );

        self.state
            .registry
            .register(&self.connection_id, self.cancel.clone(), &self.target_language);
        self.state.increment_active_sessions();

        let sink = Arc::new(ActorSink {
            addr: ctx.address(),
        });
        let emitter = EventEmitter::new(sink, self.cancel.clone());

        emitter.send(&TranscriptEvent::connected(self.connection_id.as_str()));
        self.spawn_pipeline(emitter.clone(), ctx.address());
        self.emitter = Some(emitter);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // The write path is gone: no event may be sent past this point.
        self.cancel.mark_stopped();
        self.state.decrement_active_sessions();

        // Registry removal is the last action of teardown
        self.state.registry.unregister(&self.connection_id);
        info!(connection_id = %self.connection_id, "Transcription session closed");
    }
}

impl Handler<SendText> for TranscribeWebSocket {
    type Result = ();

    fn handle(&mut self, msg: SendText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl Handler<PipelineDone> for TranscribeWebSocket {
    type Result = ();

    fn handle(&mut self, _msg: PipelineDone, ctx: &mut Self::Context) {
        debug!(connection_id = %self.connection_id, "Pipeline drained, closing connection");
        ctx.close(None);
        ctx.stop();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for TranscribeWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                if is_stop_command(&text) {
                    // Only the transition into StopRequested gets the ack;
                    // repeated stops are idempotent
                    if self.cancel.request_stop() {
                        info!(connection_id = %self.connection_id, "Stop command received");
                        if let Some(emitter) = &self.emitter {
                            emitter.send(&TranscriptEvent::stopping());
                        }
                    }
                } else {
                    debug!("Ignoring unrecognized client message: {}", text);
                }
            }
            Ok(ws::Message::Binary(_)) => {
                // Audio is captured server-side; client binary frames carry
                // nothing this session consumes
                debug!("Ignoring binary frame from client");
            }
            Ok(ws::Message::Ping(payload)) => ctx.pong(&payload),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                info!(connection_id = %self.connection_id, "Client closed connection");
                self.cancel.request_stop();
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(err) => {
                warn!(connection_id = %self.connection_id, "WebSocket protocol error: {}", err);
                self.cancel.request_stop();
                ctx.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_command_is_recognized() {
        assert!(is_stop_command(r#"{"command":"stop"}"#));
        assert!(is_stop_command(r#"{"command":"stop","extra":1}"#));
    }

    #[test]
    fn other_messages_are_not_stops() {
        assert!(!is_stop_command(r#"{"command":"pause"}"#));
        assert!(!is_stop_command(r#"{"cmd":"stop"}"#));
        assert!(!is_stop_command("not json"));
        assert!(!is_stop_command(""));
    }
}
