//! # Transcription Session Module
//!
//! Everything that runs per WebSocket connection: the tri-state cancellation
//! signal, the transcript event schema and connection emitter, the core
//! streaming state machine, and the process-wide session registry.
//!
//! ## Key Components:
//! - **CancelSignal**: cooperative shutdown shared by capture, client
//!   message handling, and the recognizer loops
//! - **TranscriptionSession**: `INIT → STREAMING → DRAINING → CLOSED` state
//!   machine with a guarded exactly-once terminal event
//! - **EventEmitter**: sole owner of the connection write path
//! - **SessionRegistry**: connection-id → session bookkeeping for
//!   introspection

pub mod cancel;        // tri-state cooperative cancellation
pub mod events;        // wire events and the connection emitter
pub mod registry;      // process-wide session map
pub mod transcription; // the core state machine

pub use cancel::CancelSignal;
pub use events::{EventEmitter, EventSink, TranscriptEvent};
pub use registry::SessionRegistry;
pub use transcription::TranscriptionSession;
