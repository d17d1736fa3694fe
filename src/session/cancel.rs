//! # Cancellation Signal
//!
//! Tri-state cooperative shutdown flag shared by every concurrent unit of a
//! transcription session: the audio capture thread, the client message
//! handling on the connection, and the recognizer request/response loops.
//!
//! ## States:
//! - **Running**: normal operation
//! - **StopRequested**: shutdown requested (stop command, client disconnect,
//!   or a fatal stream error); loops wind down, but acknowledgment and
//!   terminal events may still be written
//! - **Stopped**: the session is fully quiesced or the connection is
//!   unusable; no further writes are attempted
//!
//! Transitions are monotone (Running → StopRequested → Stopped). The state
//! never moves backwards, so racing requesters (stop command, disconnect and
//! an internal error arriving together) are harmless.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const STOP_REQUESTED: u8 = 1;
const STOPPED: u8 = 2;

/// Shared cancellation flag for one session.
///
/// Cloning is cheap and every clone observes the same state. Cancellation is
/// cooperative: units finish their current short-timeout wait (at most
/// ~500 ms) before observing the signal.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    state: Arc<AtomicU8>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown of the session.
    ///
    /// Returns `true` only for the caller that performed the
    /// Running → StopRequested transition. The stop acknowledgment and the
    /// terminal event are tied to that first request, which makes repeated
    /// stop commands idempotent.
    pub fn request_stop(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, STOP_REQUESTED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Mark the session fully stopped.
    ///
    /// Called when teardown has finished or a send failure showed the
    /// connection to be unreachable. Implies `StopRequested`.
    pub fn mark_stopped(&self) {
        self.state.fetch_max(STOPPED, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested (or already completed).
    pub fn is_stop_requested(&self) -> bool {
        self.state.load(Ordering::SeqCst) >= STOP_REQUESTED
    }

    /// Whether the session is fully stopped.
    pub fn is_stopped(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STOPPED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        let cancel = CancelSignal::new();
        assert!(!cancel.is_stop_requested());
        assert!(!cancel.is_stopped());
    }

    #[test]
    fn first_stop_request_wins() {
        let cancel = CancelSignal::new();
        assert!(cancel.request_stop());
        // Second and third requests observe the transition already happened
        assert!(!cancel.request_stop());
        assert!(!cancel.request_stop());
        assert!(cancel.is_stop_requested());
        assert!(!cancel.is_stopped());
    }

    #[test]
    fn stopped_is_terminal() {
        let cancel = CancelSignal::new();
        cancel.mark_stopped();
        assert!(cancel.is_stopped());
        assert!(cancel.is_stop_requested());
        // A late stop request cannot move the state backwards
        assert!(!cancel.request_stop());
        assert!(cancel.is_stopped());
    }

    #[test]
    fn clones_share_state() {
        let cancel = CancelSignal::new();
        let observer = cancel.clone();
        assert!(cancel.request_stop());
        assert!(observer.is_stop_requested());
        observer.mark_stopped();
        assert!(cancel.is_stopped());
    }
}
