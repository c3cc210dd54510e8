//! # relboard-core
//!
//! Release tracking for the relboard dashboard - THE LOGIC.
//!
//! This crate holds everything that decides what a release looks like:
//! the record types, the lifecycle step state machine, revisioned
//! persistence and the service operations built on top of them.
//!
//! ## Layers
//!
//! - `types` / `primitives` → records, enums, errors and fixed limits
//! - `lifecycle` → pure step transitions with capture-once timestamps
//! - `storage` → byte-level `RecordStore` with conditional saves
//! - `repository` → typed access and the retrying `mutate` cycle
//! - `service` → the operations the HTTP API and CLI expose
//!
//! ## Constraints
//!
//! - No async and no network: callers on a runtime wrap calls themselves
//! - Time is read only through an injected `mockable::Clock`
//! - Every write is conditional on the revision it was computed from

// =============================================================================
// MODULES
// =============================================================================

pub mod lifecycle;
pub mod primitives;
pub mod repository;
pub mod seed;
pub mod service;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Hashrelease, ProjectId, RelboardError, Release, ReleaseStep, StepStatus, Timestamp,
};

// =============================================================================
// RE-EXPORTS: Lifecycle, Persistence, Service
// =============================================================================

pub use lifecycle::{advance_release_step, advance_step, stamp_step, update_step_status};
pub use repository::{EntityConfig, HASHRELEASES, RELEASES, Record, Repository};
pub use seed::{SeedCatalog, seed_catalog, seed_hashrelease_id};
pub use service::{Dashboard, ProjectSummary, ReleaseService, SeedReport};
pub use storage::{MemoryStore, RecordStore, RedbStore, Revision, StoredRecord};
