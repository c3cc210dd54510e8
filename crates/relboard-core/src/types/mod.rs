//! # Core Type Definitions
//!
//! This module contains the record types tracked by relboard:
//! - Project partition (`ProjectId`)
//! - Step status cycle (`StepStatus`)
//! - Release records and their lifecycle (`Release`, `ReleaseStep`)
//! - Build/test candidates (`Hashrelease`)
//! - Error type (`RelboardError`)
//!
//! All timestamps are UTC. Wire names are camelCase; status values use the
//! kebab-case strings `pending`, `in-progress`, `done`, `error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// UTC wall-clock timestamp used for every recorded instant.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// PROJECT
// =============================================================================

/// Top-level partition of releases and hashreleases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectId {
    Oss,
    Enterprise,
}

impl ProjectId {
    /// Every project, in display order.
    pub const ALL: [ProjectId; 2] = [ProjectId::Oss, ProjectId::Enterprise];

    /// Wire form of the project identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oss => "oss",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectId {
    type Err = RelboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oss" => Ok(Self::Oss),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(RelboardError::InvalidProject(other.to_string())),
        }
    }
}

// =============================================================================
// STEP STATUS
// =============================================================================

/// Status of a single lifecycle step.
///
/// Statuses form a closed cycle:
/// `pending → in-progress → done → error → pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Done,
    Error,
}

impl StepStatus {
    /// The cycle in order. `successor` walks this table and wraps at the end.
    pub const ALL: [StepStatus; 4] = [
        StepStatus::Pending,
        StepStatus::InProgress,
        StepStatus::Done,
        StepStatus::Error,
    ];

    /// Position of this status in [`StepStatus::ALL`].
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Done => 2,
            Self::Error => 3,
        }
    }

    /// The status that follows this one in the cycle.
    ///
    /// Total over all four values; `Error` wraps back to `Pending`.
    #[must_use]
    pub const fn successor(self) -> Self {
        match self {
            Self::Pending => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::Error,
            Self::Error => Self::Pending,
        }
    }

    /// Wire form of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = RelboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| RelboardError::InvalidStatus(s.to_string()))
    }
}

// =============================================================================
// RELEASE STEP
// =============================================================================

/// A named stage in a release's progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStep {
    pub name: String,
    pub status: StepStatus,
    /// Stamped the first time the step enters `in-progress`.
    pub started_at: Option<Timestamp>,
    /// Stamped the first time the step enters `done`.
    pub completed_at: Option<Timestamp>,
}

impl ReleaseStep {
    /// Create an unstamped step.
    #[must_use]
    pub fn new(name: impl Into<String>, status: StepStatus) -> Self {
        Self {
            name: name.into(),
            status,
            started_at: None,
            completed_at: None,
        }
    }
}

// =============================================================================
// RELEASE
// =============================================================================

/// A formally tracked promotion of a hashrelease to a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    pub project_id: ProjectId,
    pub branch: String,
    pub hashrelease_id: String,
    pub version: String,
    pub release_manager: String,
    pub started_at: Timestamp,
    /// Set by processes outside the step engine.
    pub completed_at: Option<Timestamp>,
    pub lifecycle: Vec<ReleaseStep>,
}

impl Release {
    /// Find a lifecycle step by exact name.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&ReleaseStep> {
        self.lifecycle.iter().find(|step| step.name == name)
    }

    /// Step names in lifecycle order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.lifecycle.iter().map(|step| step.name.as_str())
    }
}

// =============================================================================
// HASHRELEASE
// =============================================================================

/// A build/test candidate identified by a commit-like hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hashrelease {
    pub id: String,
    pub project_id: ProjectId,
    pub branch: String,
    /// The version this candidate would carry if released.
    pub version: String,
    pub build_success: bool,
    pub test_success: bool,
    pub is_ready_for_release: bool,
    pub component_versions: BTreeMap<String, String>,
    pub created_at: Timestamp,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in relboard.
///
/// Not-found, bad-input and transient (conflict) classes are kept apart so
/// callers can map them without inspecting messages.
#[derive(Debug, Error)]
pub enum RelboardError {
    /// No release is stored under this id.
    #[error("Release not found: {0}")]
    ReleaseNotFound(String),

    /// No hashrelease is stored under this id.
    #[error("Hashrelease not found: {0}")]
    HashreleaseNotFound(String),

    /// The release exists but has no step with this name.
    #[error("Step '{step}' not found in release {release}")]
    StepNotFound { release: String, step: String },

    /// Caller-supplied input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not one of the four canonical step statuses.
    #[error("Invalid step status: '{0}'")]
    InvalidStatus(String),

    /// Not a known project identifier.
    #[error("Invalid project: '{0}'")]
    InvalidProject(String),

    /// A conditional save lost against a concurrent writer.
    #[error("Write conflict on {key}: expected revision {expected:?}, found {found:?}")]
    Conflict {
        key: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    /// Every retry of a load-transform-save cycle hit a conflict.
    #[error("Gave up on {key} after {attempts} conflicting attempts")]
    RetriesExhausted { key: String, attempts: u32 },

    /// The record's revision counter cannot advance any further.
    #[error("Revision counter exhausted for {0}")]
    RevisionOverflow(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage engine error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl RelboardError {
    /// True for failures that may succeed if the caller tries again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::RetriesExhausted { .. })
    }

    /// True for the not-found class.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ReleaseNotFound(_) | Self::HashreleaseNotFound(_) | Self::StepNotFound { .. }
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
