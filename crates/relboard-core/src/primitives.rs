//! # Primitives
//!
//! Fixed limits and names shared across the core.

/// Step names of a freshly created release, in lifecycle order.
pub const LIFECYCLE_TEMPLATE: [&str; 6] = [
    "Started",
    "Images Published",
    "Artifacts Published",
    "Operator Published",
    "Release Validated",
    "Docs Merged",
];

/// Default number of load-transform-save attempts before giving up.
pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 5;

/// Upper bound on a step name accepted from callers, in bytes.
pub const MAX_STEP_NAME_LENGTH: usize = 256;

/// Maximum records returned by a single list call.
pub const MAX_LIST_LIMIT: usize = 100;

/// Records per project shown on the dashboard.
pub const DASHBOARD_RECENT_LIMIT: usize = 5;

/// Prefix of the marker keys that record a completed seed.
pub const SEED_MARKER_PREFIX: &str = "seeded:";

/// Length of generated hashrelease ids (short commit-hash style).
pub const HASHRELEASE_ID_LENGTH: usize = 7;
