//! # Typed Repositories
//!
//! `Repository<T>` turns the byte-level [`RecordStore`] into typed access for
//! one record kind. Per-kind names are plain configuration
//! ([`EntityConfig`]), not trait statics.
//!
//! Writes go through [`Repository::mutate`]: load with revision, transform,
//! conditional save, and on conflict reload and re-apply the transform, up to
//! the configured attempt bound.

use crate::primitives::{MAX_LIST_LIMIT, SEED_MARKER_PREFIX};
use crate::storage::{RecordStore, Revision};
use crate::{Hashrelease, Release, RelboardError};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::sync::Arc;

/// A record type that can be kept in a repository.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Storage key of this record.
    fn record_id(&self) -> &str;
}

impl Record for Release {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Hashrelease {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Naming for one record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityConfig {
    /// Storage kind; part of every record key.
    pub name: &'static str,
    /// Collection name; used for the seed marker.
    pub index_name: &'static str,
}

impl EntityConfig {
    /// Marker key recording that this kind's catalog has been seeded.
    #[must_use]
    pub fn seed_marker(&self) -> String {
        format!("{}{}", SEED_MARKER_PREFIX, self.index_name)
    }
}

/// Configuration for release records.
pub const RELEASES: EntityConfig = EntityConfig {
    name: "release",
    index_name: "releases",
};

/// Configuration for hashrelease records.
pub const HASHRELEASES: EntityConfig = EntityConfig {
    name: "hashrelease",
    index_name: "hashreleases",
};

/// Typed access to one record kind in a shared store.
pub struct Repository<T> {
    store: Arc<dyn RecordStore>,
    config: EntityConfig,
    max_attempts: u32,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
            max_attempts: self.max_attempts,
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.config)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl<T: Record> Repository<T> {
    /// Create a repository. `max_attempts` is clamped to at least 1.
    pub fn new(store: Arc<dyn RecordStore>, config: EntityConfig, max_attempts: u32) -> Self {
        Self {
            store,
            config,
            max_attempts: max_attempts.max(1),
            _record: PhantomData,
        }
    }

    /// The naming this repository was built with.
    #[must_use]
    pub fn config(&self) -> EntityConfig {
        self.config
    }

    /// Load a record by id.
    pub fn get(&self, id: &str) -> Result<Option<T>, RelboardError> {
        Ok(self.get_versioned(id)?.map(|(_, record)| record))
    }

    /// Load a record together with the revision it was read at.
    pub fn get_versioned(&self, id: &str) -> Result<Option<(Revision, T)>, RelboardError> {
        match self.store.load(self.config.name, id)? {
            Some(stored) => Ok(Some((stored.revision, decode(&stored.payload)?))),
            None => Ok(None),
        }
    }

    /// Whether a record is stored under `id`.
    pub fn exists(&self, id: &str) -> Result<bool, RelboardError> {
        Ok(self.store.load(self.config.name, id)?.is_some())
    }

    /// List up to `limit` records (capped at `MAX_LIST_LIMIT`), in id order.
    pub fn list(&self, limit: usize) -> Result<Vec<T>, RelboardError> {
        self.store
            .list(self.config.name, limit.min(MAX_LIST_LIMIT))?
            .iter()
            .map(|stored| decode(&stored.payload))
            .collect()
    }

    /// Store `record` only if nothing exists under its id.
    ///
    /// Returns `false` when a record was already present.
    pub fn insert_new(&self, record: &T) -> Result<bool, RelboardError> {
        match self.save_as(record.record_id(), record, None) {
            Ok(_) => Ok(true),
            Err(RelboardError::Conflict { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Store `record` if the stored revision still equals `expected`.
    pub fn save_if(&self, record: &T, expected: Option<Revision>) -> Result<Revision, RelboardError> {
        self.save_as(record.record_id(), record, expected)
    }

    /// Create or overwrite `record`, retrying on conflict.
    pub fn put(&self, record: &T) -> Result<Revision, RelboardError> {
        let id = record.record_id();
        for _ in 0..self.max_attempts {
            let expected = self.store.load(self.config.name, id)?.map(|s| s.revision);
            match self.save_as(id, record, expected) {
                Err(RelboardError::Conflict { .. }) => continue,
                result => return result,
            }
        }
        Err(self.exhausted(id))
    }

    /// Load → transform → conditional save, re-applied on conflict.
    ///
    /// Returns `Ok(None)` if no record exists under `id`. An error from
    /// `transform` aborts immediately and nothing is written.
    ///
    /// # Errors
    ///
    /// `RelboardError::RetriesExhausted` once every attempt has conflicted.
    pub fn mutate<F>(&self, id: &str, mut transform: F) -> Result<Option<T>, RelboardError>
    where
        F: FnMut(&T) -> Result<T, RelboardError>,
    {
        for attempt in 1..=self.max_attempts {
            let Some((revision, current)) = self.get_versioned(id)? else {
                return Ok(None);
            };
            let updated = transform(&current)?;

            match self.save_as(id, &updated, Some(revision)) {
                Ok(new_revision) => {
                    tracing::debug!(
                        entity = self.config.name,
                        id,
                        revision = new_revision.value(),
                        attempt,
                        "record updated"
                    );
                    return Ok(Some(updated));
                }
                Err(RelboardError::Conflict { .. }) => {
                    tracing::debug!(
                        entity = self.config.name,
                        id,
                        attempt,
                        "write conflict, reloading"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(
            entity = self.config.name,
            id,
            attempts = self.max_attempts,
            "giving up after repeated write conflicts"
        );
        Err(self.exhausted(id))
    }

    /// Write `records` once per store, gated by this kind's seed marker.
    ///
    /// Records that already exist are left as they are. Returns the number
    /// of records written; `0` once the marker is set.
    pub fn ensure_seeded(&self, records: &[T]) -> Result<usize, RelboardError> {
        let marker = self.config.seed_marker();
        if self.store.has_marker(&marker)? {
            return Ok(0);
        }

        let mut written = 0;
        for record in records {
            if self.insert_new(record)? {
                written += 1;
            }
        }
        self.store.set_marker(&marker)?;

        tracing::info!(entity = self.config.name, written, "seeded catalog");
        Ok(written)
    }

    fn save_as(&self, id: &str, record: &T, expected: Option<Revision>) -> Result<Revision, RelboardError> {
        let payload = postcard::to_allocvec(record)
            .map_err(|e| RelboardError::SerializationError(e.to_string()))?;
        self.store.save(self.config.name, id, &payload, expected)
    }

    fn exhausted(&self, id: &str) -> RelboardError {
        RelboardError::RetriesExhausted {
            key: format!("{}/{}", self.config.name, id),
            attempts: self.max_attempts,
        }
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, RelboardError> {
    postcard::from_bytes(payload).map_err(|e| RelboardError::DeserializationError(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
