//! # Record Storage
//!
//! A small key-value contract for whole-record persistence.
//!
//! Records are opaque byte payloads addressed by `(kind, id)` and carry a
//! [`Revision`]. Every write is a conditional save: it commits only when the
//! caller's expected revision matches what is stored, so two writers that
//! started from the same snapshot cannot both win.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: process-local, mutex guarded (tests, `--backend memory`)
//! - [`RedbStore`]: disk-backed, ACID, single-writer transactions

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::RelboardError;
use serde::{Deserialize, Serialize};

/// Monotonic per-record version. The first committed save is revision 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    /// Revision assigned on creation.
    pub const FIRST: Revision = Revision(1);

    /// The revision that follows this one, or `None` at `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Raw revision number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// A stored record as read back from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
    pub revision: Revision,
    pub payload: Vec<u8>,
}

/// Persistence collaborator for repositories.
///
/// Implementations must make [`RecordStore::save`] atomic: the revision check
/// and the write happen as one step with respect to other savers.
pub trait RecordStore: Send + Sync {
    /// Load one record, or `None` if nothing is stored under `(kind, id)`.
    fn load(&self, kind: &str, id: &str) -> Result<Option<StoredRecord>, RelboardError>;

    /// List up to `limit` records of `kind`, in id order.
    fn list(&self, kind: &str, limit: usize) -> Result<Vec<StoredRecord>, RelboardError>;

    /// Write `payload` if the stored revision equals `expected`.
    ///
    /// `expected = None` means the record must not exist yet. On success the
    /// new revision is returned.
    ///
    /// # Errors
    ///
    /// Returns `RelboardError::Conflict` when the stored revision differs.
    fn save(
        &self,
        kind: &str,
        id: &str,
        payload: &[u8],
        expected: Option<Revision>,
    ) -> Result<Revision, RelboardError>;

    /// Whether the named marker key has been set.
    fn has_marker(&self, name: &str) -> Result<bool, RelboardError>;

    /// Set the named marker key. Setting it twice is harmless.
    fn set_marker(&self, name: &str) -> Result<(), RelboardError>;
}

/// Revision to write after a check that found `found` stored.
pub(crate) fn next_revision(
    kind: &str,
    id: &str,
    found: Option<Revision>,
) -> Result<Revision, RelboardError> {
    match found {
        None => Ok(Revision::FIRST),
        Some(current) => current
            .next()
            .ok_or_else(|| RelboardError::RevisionOverflow(format!("{}/{}", kind, id))),
    }
}

/// Build the conflict error reported by both backends.
pub(crate) fn conflict(
    kind: &str,
    id: &str,
    expected: Option<Revision>,
    found: Option<Revision>,
) -> RelboardError {
    RelboardError::Conflict {
        key: format!("{}/{}", kind, id),
        expected: expected.map(Revision::value),
        found: found.map(Revision::value),
    }
}

// =============================================================================
// TESTS
// =============================================================================
