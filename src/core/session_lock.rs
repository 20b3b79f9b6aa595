//! Per-session serialization.
//!
//! Every operation on a session is a read-modify-write of its learner state, so two
//! requests for the same session must not interleave. Each session id gets its own
//! mutex; requests for different sessions never contend beyond the registry lookup.
//! An entry is dropped from the registry once no caller holds or waits on it.

use crate::core::error::TutorError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct SessionLocks {
    entries: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, session_id: &str) -> Result<Arc<Mutex<()>>, TutorError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| TutorError::LockPoisoned("session lock registry"))?;
        Ok(entries
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Run `f` while holding the session's lock.
    pub fn with_session<F, R>(&self, session_id: &str, f: F) -> Result<R, TutorError>
    where
        F: FnOnce() -> Result<R, TutorError>,
    {
        let entry = self.entry(session_id)?;
        let result = {
            let _guard = entry
                .lock()
                .map_err(|_| TutorError::LockPoisoned("session lock"))?;
            f()
        };
        drop(entry);
        self.forget(session_id);
        result
    }

    /// Drop the registry entry for `session_id` unless another caller still holds
    /// a handle to its mutex.
    pub fn forget(&self, session_id: &str) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries
            .get(session_id)
            .is_some_and(|m| Arc::strong_count(m) == 1)
        {
            entries.remove(session_id);
        }
    }

    pub fn tracked(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}
