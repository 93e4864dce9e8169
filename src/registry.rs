//! Process-wide session registry.
//!
//! Maps session identifiers to their cancellation tokens and join handles.
//! The registry is the sole owner of the id association: insert and remove
//! are atomic with respect to concurrent connect/disconnect events, no
//! identifier appears twice, and callers never take locks themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crate::error::PipelineError;
use crate::session::CancelToken;

pub(crate) struct SessionEntry {
    pub(crate) cancel: Arc<CancelToken>,
    pub(crate) join: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an identifier. Fails with `DuplicateSession` when the id is
    /// already registered; the map is untouched in that case.
    pub(crate) fn register(
        &self,
        id: &str,
        cancel: Arc<CancelToken>,
    ) -> Result<(), PipelineError> {
        let mut sessions = self.lock();
        if sessions.contains_key(id) {
            return Err(PipelineError::DuplicateSession(id.to_string()));
        }
        sessions.insert(
            id.to_string(),
            SessionEntry { cancel, join: None },
        );
        Ok(())
    }

    /// Attach the session thread's join handle after spawn. Returns the
    /// handle back when the entry is already gone (the loop finished and
    /// removed itself before we got here).
    pub(crate) fn attach_join(&self, id: &str, join: JoinHandle<()>) -> Option<JoinHandle<()>> {
        let mut sessions = self.lock();
        match sessions.get_mut(id) {
            Some(entry) => {
                entry.join = Some(join);
                None
            }
            None => Some(join),
        }
    }

    /// Set the session's cancellation signal. Returns false for an unknown
    /// id; never an error, since this legitimately races with the session's
    /// own teardown.
    pub fn cancel(&self, id: &str) -> bool {
        let sessions = self.lock();
        match sessions.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove an entry. Idempotent: removing a missing id returns false.
    pub fn remove(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cancel every session and take their join handles for the caller to
    /// join. Entries stay in the map; each loop removes its own on exit.
    pub(crate) fn cancel_all(&self) -> Vec<JoinHandle<()>> {
        let mut sessions = self.lock();
        let mut joins = Vec::new();
        for entry in sessions.values_mut() {
            entry.cancel.cancel();
            if let Some(join) = entry.join.take() {
                joins.push(join);
            }
        }
        joins
    }

    // A poisoned map was mutated only under the lock by the short, panic-free
    // operations above; recover rather than propagate.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
