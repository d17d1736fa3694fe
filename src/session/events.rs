//! # Transcript Events and the Connection Emitter
//!
//! Outward-facing event schema for the transcription WebSocket plus the
//! emitter that owns the connection write path.
//!
//! ## Message Format (server → client, JSON text frames):
//! - `{"status":"connected","connection_id":...}`
//! - `{"status":"INTERIM","original":...,"translation"?:...,"is_final":false}`
//! - `{"status":"FINAL","original":...,"translation":...,"is_final":true}`
//! - `{"status":"STOPPING","message":...}`
//! - `{"status":"COMPLETE","is_final":true}`
//! - `{"status":"ERROR","error":...,"is_final":true}`
//!
//! Every write to the connection goes through [`EventEmitter`]; the client
//! message handler and the session's response consumer never write directly,
//! which keeps concurrent notifications from interleaving.

use crate::session::cancel::CancelSignal;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// One unit sent over the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum TranscriptEvent {
    /// Session accepted; first event on every connection.
    #[serde(rename = "connected")]
    Connected { connection_id: String },

    /// Provisional transcript. `translation` is present only when the result
    /// was translate-worthy.
    #[serde(rename = "INTERIM")]
    Interim {
        original: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        translation: Option<String>,
        is_final: bool,
    },

    /// Transcript the recognizer will not revise further. Always translated.
    #[serde(rename = "FINAL")]
    Final {
        original: String,
        translation: String,
        is_final: bool,
    },

    /// Acknowledgment of a client stop command.
    #[serde(rename = "STOPPING")]
    Stopping { message: String },

    /// Terminal event: session finished normally.
    #[serde(rename = "COMPLETE")]
    Complete { is_final: bool },

    /// Terminal event: session ended on a fatal error.
    #[serde(rename = "ERROR")]
    Error { error: String, is_final: bool },
}

impl TranscriptEvent {
    pub fn connected(connection_id: impl Into<String>) -> Self {
        Self::Connected {
            connection_id: connection_id.into(),
        }
    }

    pub fn stopping() -> Self {
        Self::Stopping {
            message: "Stop command received".into(),
        }
    }

    pub fn complete() -> Self {
        Self::Complete { is_final: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
            is_final: true,
        }
    }

    /// COMPLETE and ERROR mark the end of a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Write half of the client connection.
///
/// `write` returns `false` when the connection can no longer accept frames
/// (closed, or its mailbox is gone). Implementations must not block.
pub trait EventSink: Send + Sync {
    fn write(&self, payload: String) -> bool;
}

/// Sole owner of the connection write path for one session.
///
/// ## Send Policy:
/// - a fully `Stopped` session sends nothing
/// - while merely stop-requested, events still go out, so the STOPPING
///   acknowledgment and the terminal event reach the client during drain
/// - a send failure marks the session `Stopped` as a side effect; once the
///   client is unreachable the session must wind down
///
/// Never raises past its boundary; failures are logged and reported through
/// the return value.
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn EventSink>,
    cancel: CancelSignal,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn EventSink>, cancel: CancelSignal) -> Self {
        Self { sink, cancel }
    }

    /// Serialize and send one event. Returns whether the send succeeded.
    pub fn send(&self, event: &TranscriptEvent) -> bool {
        if self.cancel.is_stopped() {
            debug!("Suppressing event after session stop: {:?}", event);
            return false;
        }

        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Failed to serialize event: {}", err);
                return false;
            }
        };

        if self.sink.write(payload) {
            true
        } else {
            warn!("Event send failed, winding session down");
            self.cancel.mark_stopped();
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records every payload; optionally starts rejecting writes.
    pub struct RecordingSink {
        pub sent: Mutex<Vec<String>>,
        pub healthy: Mutex<bool>,
    }

    impl RecordingSink {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                healthy: Mutex::new(true),
            })
        }

        pub fn break_connection(&self) {
            *self.healthy.lock().unwrap() = false;
        }

        pub fn events(&self) -> Vec<TranscriptEvent> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|payload| serde_json::from_str(payload).unwrap())
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn write(&self, payload: String) -> bool {
            if !*self.healthy.lock().unwrap() {
                return false;
            }
            self.sent.lock().unwrap().push(payload);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::*;
    use serde_json::{json, Value};

    fn to_json(event: &TranscriptEvent) -> Value {
        serde_json::to_value(event).unwrap()
    }

    #[test]
    fn wire_shapes_match_the_protocol() {
        assert_eq!(
            to_json(&TranscriptEvent::connected("abc")),
            json!({"status": "connected", "connection_id": "abc"})
        );
        assert_eq!(
            to_json(&TranscriptEvent::Interim {
                original: "He".into(),
                translation: None,
                is_final: false,
            }),
            json!({"status": "INTERIM", "original": "He", "is_final": false})
        );
        assert_eq!(
            to_json(&TranscriptEvent::Final {
                original: "Hello".into(),
                translation: "Hola".into(),
                is_final: true,
            }),
            json!({
                "status": "FINAL",
                "original": "Hello",
                "translation": "Hola",
                "is_final": true
            })
        );
        assert_eq!(
            to_json(&TranscriptEvent::complete()),
            json!({"status": "COMPLETE", "is_final": true})
        );
        assert_eq!(
            to_json(&TranscriptEvent::error("boom")),
            json!({"status": "ERROR", "error": "boom", "is_final": true})
        );
    }

    #[test]
    fn untranslated_interim_omits_translation_key() {
        let payload = serde_json::to_string(&TranscriptEvent::Interim {
            original: "He".into(),
            translation: None,
            is_final: false,
        })
        .unwrap();
        assert!(!payload.contains("translation"));
    }

    #[test]
    fn terminal_classification() {
        assert!(TranscriptEvent::complete().is_terminal());
        assert!(TranscriptEvent::error("x").is_terminal());
        assert!(!TranscriptEvent::stopping().is_terminal());
        assert!(!TranscriptEvent::connected("id").is_terminal());
    }

    #[test]
    fn sends_while_stop_requested_but_not_stopped() {
        let sink = RecordingSink::new();
        let cancel = CancelSignal::new();
        let emitter = EventEmitter::new(sink.clone(), cancel.clone());

        cancel.request_stop();
        assert!(emitter.send(&TranscriptEvent::stopping()));
        assert!(emitter.send(&TranscriptEvent::complete()));

        cancel.mark_stopped();
        assert!(!emitter.send(&TranscriptEvent::complete()));
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn send_failure_stops_the_session() {
        let sink = RecordingSink::new();
        let cancel = CancelSignal::new();
        let emitter = EventEmitter::new(sink.clone(), cancel.clone());

        sink.break_connection();
        assert!(!emitter.send(&TranscriptEvent::connected("id")));
        assert!(cancel.is_stopped());

        // No further sends are attempted once the connection is unreachable
        assert!(!emitter.send(&TranscriptEvent::complete()));
    }
}
