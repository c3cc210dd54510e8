//! In-memory record store.

use super::{RecordStore, Revision, StoredRecord, conflict, next_revision};
use crate::RelboardError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// Thread-safe in-memory store. Volatile: contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<(String, String), (Revision, Vec<u8>)>,
    markers: BTreeSet<String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RelboardError> {
        self.inner
            .lock()
            .map_err(|_| RelboardError::IoError("memory store lock poisoned".to_string()))
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, kind: &str, id: &str) -> Result<Option<StoredRecord>, RelboardError> {
        let state = self.state()?;
        Ok(state
            .records
            .get(&(kind.to_string(), id.to_string()))
            .map(|(revision, payload)| StoredRecord {
                id: id.to_string(),
                revision: *revision,
                payload: payload.clone(),
            }))
    }

    fn list(&self, kind: &str, limit: usize) -> Result<Vec<StoredRecord>, RelboardError> {
        let state = self.state()?;
        Ok(state
            .records
            .iter()
            .filter(|((record_kind, _), _)| record_kind == kind)
            .take(limit)
            .map(|((_, id), (revision, payload))| StoredRecord {
                id: id.clone(),
                revision: *revision,
                payload: payload.clone(),
            })
            .collect())
    }

    fn save(
        &self,
        kind: &str,
        id: &str,
        payload: &[u8],
        expected: Option<Revision>,
    ) -> Result<Revision, RelboardError> {
        let mut state = self.state()?;
        let key = (kind.to_string(), id.to_string());
        let found = state.records.get(&key).map(|(revision, _)| *revision);

        if found != expected {
            return Err(conflict(kind, id, expected, found));
        }

        let next = next_revision(kind, id, found)?;
        state.records.insert(key, (next, payload.to_vec()));
        Ok(next)
    }

    fn has_marker(&self, name: &str) -> Result<bool, RelboardError> {
        Ok(self.state()?.markers.contains(name))
    }

    fn set_marker(&self, name: &str) -> Result<(), RelboardError> {
        self.state()?.markers.insert(name.to_string());
        Ok(())
    }
}
