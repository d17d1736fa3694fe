//! # Session Registry
//!
//! Process-wide bookkeeping of active transcription sessions, keyed by
//! connection id. The registry lives inside the application state object
//! passed to connection handlers rather than in a global, and it is not
//! required for a session's own teardown: entries exist for introspection
//! (health reporting, a future admin kill surface).
//!
//! ## Invariant:
//! An entry exists if and only if the corresponding session is active.
//! Removal is the last action of connection teardown.

use crate::session::cancel::CancelSignal;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-session bookkeeping: the shared cancellation signal and a little
/// metadata for introspection.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub cancel: CancelSignal,
    pub target_language: String,
    pub started_at: DateTime<Utc>,
}

/// Synchronized connection-id → session map, scoped to the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: &str, cancel: CancelSignal, target_language: &str) {
        let entry = SessionEntry {
            cancel,
            target_language: target_language.to_string(),
            started_at: Utc::now(),
        };
        self.entries
            .write()
            .unwrap()
            .insert(connection_id.to_string(), entry);
    }

    /// Remove a session's entry. Returns whether it was present.
    pub fn unregister(&self, connection_id: &str) -> bool {
        self.entries.write().unwrap().remove(connection_id).is_some()
    }

    pub fn active_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Snapshot of every active session, for health reporting.
    pub fn entries(&self) -> Vec<(String, SessionEntry)> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    /// Request shutdown of a session by connection id. Operator surface used
    /// by the admin stop endpoint; a session does not need this for its own
    /// teardown.
    pub fn request_stop(&self, connection_id: &str) -> bool {
        match self.entries.read().unwrap().get(connection_id) {
            Some(entry) => {
                entry.cancel.request_stop();
                true
            }
            None => false,
        }
    }
}
