//! # redb-backed Record Store
//!
//! Disk-backed storage using the redb embedded database.
//!
//! redb runs at most one write transaction at a time, so the revision check
//! and the insert in [`RedbStore::save`] cannot interleave with another
//! saver. Readers use MVCC snapshots and never block writers.

use super::{RecordStore, Revision, StoredRecord, conflict, next_revision};
use crate::RelboardError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Table for records: (kind, id) -> postcard-encoded [`Envelope`]
const RECORDS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("records");

/// Table for marker keys: name -> 1
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Stored form of a record: its revision alongside the caller's payload.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    revision: u64,
    payload: Vec<u8>,
}

fn io_err(e: impl Display) -> RelboardError {
    RelboardError::IoError(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<Envelope, RelboardError> {
    postcard::from_bytes(bytes).map_err(|e| RelboardError::DeserializationError(e.to_string()))
}

fn encode(revision: Revision, payload: &[u8]) -> Result<Vec<u8>, RelboardError> {
    postcard::to_allocvec(&Envelope {
        revision: revision.value(),
        payload: payload.to_vec(),
    })
    .map_err(|e| RelboardError::SerializationError(e.to_string()))
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RelboardError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Create tables up front so read transactions can always open them.
        let write_txn = db.begin_write().map_err(io_err)?;
        {
            let _ = write_txn.open_table(RECORDS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        tracing::debug!(path = %path.as_ref().display(), "opened redb record store");

        Ok(Self {
            db,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for RedbStore {
    fn load(&self, kind: &str, id: &str) -> Result<Option<StoredRecord>, RelboardError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RECORDS).map_err(io_err)?;

        let Some(guard) = table.get((kind, id)).map_err(io_err)? else {
            return Ok(None);
        };
        let envelope = decode(guard.value())?;

        Ok(Some(StoredRecord {
            id: id.to_string(),
            revision: Revision(envelope.revision),
            payload: envelope.payload,
        }))
    }

    fn list(&self, kind: &str, limit: usize) -> Result<Vec<StoredRecord>, RelboardError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RECORDS).map_err(io_err)?;

        let mut records = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            if records.len() >= limit {
                break;
            }
            let (key, value) = entry.map_err(io_err)?;
            let (record_kind, id) = key.value();
            if record_kind != kind {
                continue;
            }
            let envelope = decode(value.value())?;
            records.push(StoredRecord {
                id: id.to_string(),
                revision: Revision(envelope.revision),
                payload: envelope.payload,
            });
        }

        Ok(records)
    }

    fn save(
        &self,
        kind: &str,
        id: &str,
        payload: &[u8],
        expected: Option<Revision>,
    ) -> Result<Revision, RelboardError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;

        let outcome = {
            let mut table = write_txn.open_table(RECORDS).map_err(io_err)?;
            let found = match table.get((kind, id)).map_err(io_err)? {
                Some(guard) => Some(Revision(decode(guard.value())?.revision)),
                None => None,
            };

            if found == expected {
                next_revision(kind, id, found).and_then(|next| {
                    let bytes = encode(next, payload)?;
                    table.insert((kind, id), bytes.as_slice()).map_err(io_err)?;
                    Ok(next)
                })
            } else {
                Err(conflict(kind, id, expected, found))
            }
        };

        match outcome {
            Ok(revision) => {
                write_txn.commit().map_err(io_err)?;
                Ok(revision)
            }
            Err(e) => {
                write_txn.abort().map_err(io_err)?;
                Err(e)
            }
        }
    }

    fn has_marker(&self, name: &str) -> Result<bool, RelboardError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(METADATA).map_err(io_err)?;
        Ok(table.get(name).map_err(io_err)?.is_some())
    }

    fn set_marker(&self, name: &str) -> Result<(), RelboardError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(METADATA).map_err(io_err)?;
            table.insert(name, 1u64).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}
