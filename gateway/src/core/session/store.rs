use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::{SessionError, SessionResult, Turn};

/// Process-wide mapping from call identifier to transcript.
///
/// Backed by a sharded concurrent map so distinct calls never contend on the
/// same lock. Cloning the store is cheap and every clone sees the same
/// sessions.
///
/// The store does not order concurrent appends for the same call. Callers
/// that need arrival ordering (the relay connection handler does) must
/// serialize their own operations per call.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Vec<Turn>>>,
    system_prompt: Arc<str>,
}

impl SessionStore {
    /// Create an empty store whose sessions all start with `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            system_prompt: Arc::from(system_prompt.into()),
        }
    }

    /// Start a session for `call_sid` with a single system turn.
    ///
    /// Rejects duplicates: an existing transcript is never overwritten.
    pub fn create(&self, call_sid: &str) -> SessionResult<()> {
        match self.sessions.entry(call_sid.to_string()) {
            Entry::Occupied(_) => Err(SessionError::AlreadyExists(call_sid.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(vec![Turn::system(&*self.system_prompt)]);
                debug!(call_sid, "Session created");
                Ok(())
            }
        }
    }

    pub fn append_user_turn(&self, call_sid: &str, text: impl Into<String>) -> SessionResult<()> {
        self.append(call_sid, Turn::user(text))
    }

    pub fn append_assistant_turn(
        &self,
        call_sid: &str,
        text: impl Into<String>,
    ) -> SessionResult<()> {
        self.append(call_sid, Turn::assistant(text))
    }

    fn append(&self, call_sid: &str, turn: Turn) -> SessionResult<()> {
        let mut transcript = self
            .sessions
            .get_mut(call_sid)
            .ok_or_else(|| SessionError::NotFound(call_sid.to_string()))?;
        transcript.push(turn);
        Ok(())
    }

    /// Snapshot of the ordered transcript for `call_sid`.
    pub fn transcript(&self, call_sid: &str) -> SessionResult<Vec<Turn>> {
        self.sessions
            .get(call_sid)
            .map(|transcript| transcript.clone())
            .ok_or_else(|| SessionError::NotFound(call_sid.to_string()))
    }

    /// Remove the session for `call_sid`.
    ///
    /// Idempotent. Returns `true` if a session was actually removed.
    pub fn destroy(&self, call_sid: &str) -> bool {
        let removed = self.sessions.remove(call_sid).is_some();
        if removed {
            debug!(call_sid, "Session destroyed");
        }
        removed
    }

    pub fn contains(&self, call_sid: &str) -> bool {
        self.sessions.contains_key(call_sid)
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
