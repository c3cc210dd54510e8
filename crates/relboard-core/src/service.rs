//! # Release Service
//!
//! The operations the API and CLI share: listing and fetching records,
//! moving lifecycle steps, the dashboard summary and startup seeding.
//!
//! Step changes run through [`Repository::mutate`], so concurrent updates to
//! different steps of one release both land.

use crate::lifecycle::{advance_release_step, update_step_status};
use crate::primitives::{DASHBOARD_RECENT_LIMIT, MAX_LIST_LIMIT, MAX_STEP_NAME_LENGTH};
use crate::repository::{HASHRELEASES, RELEASES, Repository};
use crate::seed::seed_catalog;
use crate::storage::RecordStore;
use crate::{Hashrelease, ProjectId, RelboardError, Release, StepStatus};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Recent activity for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_id: ProjectId,
    /// Releases without a `completedAt`.
    pub active_releases: usize,
    /// Hashreleases flagged ready for release.
    pub ready_hashreleases: usize,
    /// Most recent releases, newest first.
    pub releases: Vec<Release>,
    /// Most recent hashreleases, newest first.
    pub hashreleases: Vec<Hashrelease>,
}

/// Dashboard view: one summary per project, keyed by project id.
///
/// Serializes as `{ "oss": {..}, "enterprise": {..} }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dashboard {
    pub projects: BTreeMap<ProjectId, ProjectSummary>,
}

impl Dashboard {
    /// Summary for one project, if present.
    #[must_use]
    pub fn project(&self, project: ProjectId) -> Option<&ProjectSummary> {
        self.projects.get(&project)
    }
}

/// Counts written by [`ReleaseService::ensure_seeded`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub hashreleases: usize,
    pub releases: usize,
}

/// Release-tracking operations over one record store.
pub struct ReleaseService<C> {
    releases: Repository<Release>,
    hashreleases: Repository<Hashrelease>,
    clock: Arc<C>,
}

impl<C> std::fmt::Debug for ReleaseService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseService")
            .field("releases", &self.releases)
            .field("hashreleases", &self.hashreleases)
            .finish_non_exhaustive()
    }
}

impl<C> ReleaseService<C>
where
    C: Clock + Send + Sync,
{
    /// Build a service over `store`. `max_attempts` bounds conflict retries.
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<C>, max_attempts: u32) -> Self {
        Self {
            releases: Repository::new(Arc::clone(&store), RELEASES, max_attempts),
            hashreleases: Repository::new(store, HASHRELEASES, max_attempts),
            clock,
        }
    }

    /// Releases, newest first, optionally limited to one project.
    pub fn list_releases(&self, project: Option<ProjectId>) -> Result<Vec<Release>, RelboardError> {
        let mut releases = self.releases.list(MAX_LIST_LIMIT)?;
        releases.retain(|r| project.is_none_or(|p| r.project_id == p));
        releases.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));
        Ok(releases)
    }

    /// Hashreleases, newest first, optionally limited to one project.
    pub fn list_hashreleases(
        &self,
        project: Option<ProjectId>,
    ) -> Result<Vec<Hashrelease>, RelboardError> {
        let mut hashreleases = self.hashreleases.list(MAX_LIST_LIMIT)?;
        hashreleases.retain(|h| project.is_none_or(|p| h.project_id == p));
        hashreleases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(hashreleases)
    }

    pub fn get_release(&self, id: &str) -> Result<Release, RelboardError> {
        self.releases
            .get(id)?
            .ok_or_else(|| RelboardError::ReleaseNotFound(id.to_string()))
    }

    pub fn get_hashrelease(&self, id: &str) -> Result<Hashrelease, RelboardError> {
        self.hashreleases
            .get(id)?
            .ok_or_else(|| RelboardError::HashreleaseNotFound(id.to_string()))
    }

    /// Set one step of a release to `status` and persist the result.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank or oversized step name
    /// - `ReleaseNotFound` / `StepNotFound` when either lookup misses
    /// - `RetriesExhausted` when concurrent writers keep winning
    pub fn update_step(
        &self,
        id: &str,
        step_name: &str,
        status: StepStatus,
    ) -> Result<Release, RelboardError> {
        validate_step_name(step_name)?;
        let clock = self.clock.as_ref();
        let updated = self
            .releases
            .mutate(id, |current| {
                update_step_status(current, step_name, status, clock)
            })?
            .ok_or_else(|| RelboardError::ReleaseNotFound(id.to_string()))?;

        tracing::info!(release = id, step = step_name, %status, "step updated");
        Ok(updated)
    }

    /// Move one step to the next status in the cycle and persist the result.
    ///
    /// The successor is computed from the stored status on each attempt, so a
    /// retried write never skips a state.
    pub fn advance_step(&self, id: &str, step_name: &str) -> Result<Release, RelboardError> {
        validate_step_name(step_name)?;
        let clock = self.clock.as_ref();
        let updated = self
            .releases
            .mutate(id, |current| {
                advance_release_step(current, step_name, clock)
            })?
            .ok_or_else(|| RelboardError::ReleaseNotFound(id.to_string()))?;

        if let Some(step) = updated.step(step_name) {
            tracing::info!(release = id, step = step_name, status = %step.status, "step advanced");
        }
        Ok(updated)
    }

    /// Per-project recent activity.
    pub fn dashboard(&self) -> Result<Dashboard, RelboardError> {
        let releases = self.list_releases(None)?;
        let hashreleases = self.list_hashreleases(None)?;

        let projects = ProjectId::ALL
            .into_iter()
            .map(|project| {
                let project_releases: Vec<&Release> =
                    releases.iter().filter(|r| r.project_id == project).collect();
                let project_hashreleases: Vec<&Hashrelease> = hashreleases
                    .iter()
                    .filter(|h| h.project_id == project)
                    .collect();

                let summary = ProjectSummary {
                    project_id: project,
                    active_releases: project_releases
                        .iter()
                        .filter(|r| r.completed_at.is_none())
                        .count(),
                    ready_hashreleases: project_hashreleases
                        .iter()
                        .filter(|h| h.is_ready_for_release)
                        .count(),
                    releases: project_releases
                        .into_iter()
                        .take(DASHBOARD_RECENT_LIMIT)
                        .cloned()
                        .collect(),
                    hashreleases: project_hashreleases
                        .into_iter()
                        .take(DASHBOARD_RECENT_LIMIT)
                        .cloned()
                        .collect(),
                };
                (project, summary)
            })
            .collect();

        Ok(Dashboard { projects })
    }

    /// Write the seed catalog unless this store has already been seeded.
    ///
    /// Hashreleases go first so every seeded release points at a stored
    /// candidate.
    pub fn ensure_seeded(&self) -> Result<SeedReport, RelboardError> {
        let catalog = seed_catalog(self.clock.utc());
        let hashreleases = self.hashreleases.ensure_seeded(&catalog.hashreleases)?;
        let releases = self.releases.ensure_seeded(&catalog.releases)?;
        Ok(SeedReport {
            hashreleases,
            releases,
        })
    }
}

fn validate_step_name(step_name: &str) -> Result<(), RelboardError> {
    if step_name.trim().is_empty() {
        return Err(RelboardError::InvalidInput(
            "stepName must not be empty".to_string(),
        ));
    }
    if step_name.len() > MAX_STEP_NAME_LENGTH {
        return Err(RelboardError::InvalidInput(format!(
            "stepName exceeds {} bytes",
            MAX_STEP_NAME_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
