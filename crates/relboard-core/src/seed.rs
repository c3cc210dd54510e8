//! # Seed Catalog
//!
//! The fixed set of releases and hashreleases a fresh store starts with.
//! Dates are relative to the clock reading passed in, so a catalog built
//! today always shows "recent" activity.
//!
//! Seeded lifecycles obey the same stamping rules as live transitions: a
//! step shown as `done` carries both timestamps, an `in-progress` step
//! carries `started_at`.

use crate::lifecycle::stamp_step;
use crate::primitives::{HASHRELEASE_ID_LENGTH, LIFECYCLE_TEMPLATE};
use crate::{Hashrelease, ProjectId, Release, ReleaseStep, StepStatus, Timestamp};
use chrono::Duration;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Records written to an empty store.
#[derive(Debug, Clone)]
pub struct SeedCatalog {
    pub hashreleases: Vec<Hashrelease>,
    pub releases: Vec<Release>,
}

/// Shape of one seeded hashrelease: branch, age in days, build/test/ready flags, version.
struct CandidateSeed {
    branch: &'static str,
    days_ago: i64,
    build_success: bool,
    test_success: bool,
    ready: bool,
    version: &'static str,
}

/// Shape of one seeded release; `candidate` indexes the project's hashreleases.
struct ReleaseSeed {
    branch: &'static str,
    candidate: usize,
    version: &'static str,
    days_ago: i64,
    complete: bool,
}

const fn candidate(
    branch: &'static str,
    days_ago: i64,
    build_success: bool,
    test_success: bool,
    ready: bool,
    version: &'static str,
) -> CandidateSeed {
    CandidateSeed {
        branch,
        days_ago,
        build_success,
        test_success,
        ready,
        version,
    }
}

const OSS_CANDIDATES: [CandidateSeed; 4] = [
    candidate("release-2.5", 1, true, true, true, "2.5.1"),
    candidate("release-2.5", 2, true, false, false, "2.5.1-rc2"),
    candidate("release-2.5", 3, false, false, false, "2.5.1-rc1"),
    candidate("release-2.4", 10, true, true, true, "2.4.3"),
];

const OSS_RELEASES: [ReleaseSeed; 2] = [
    ReleaseSeed {
        branch: "release-2.5",
        candidate: 0,
        version: "v2.5.0",
        days_ago: 5,
        complete: false,
    },
    ReleaseSeed {
        branch: "release-2.4",
        candidate: 3,
        version: "v2.4.2",
        days_ago: 12,
        complete: true,
    },
];

const ENTERPRISE_CANDIDATES: [CandidateSeed; 4] = [
    candidate("release-3.1", 0, false, false, false, "3.1.0-rc3"),
    candidate("release-3.1", 1, true, true, true, "3.1.0-rc2"),
    candidate("release-3.1", 2, true, true, true, "3.1.0-rc1"),
    candidate("release-3.0", 20, true, true, true, "3.0.5"),
];

const ENTERPRISE_RELEASES: [ReleaseSeed; 2] = [
    ReleaseSeed {
        branch: "release-3.1",
        candidate: 1,
        version: "v3.1.0",
        days_ago: 1,
        complete: false,
    },
    ReleaseSeed {
        branch: "release-3.0",
        candidate: 3,
        version: "v3.0.4",
        days_ago: 22,
        complete: true,
    },
];

const RELEASE_MANAGER: &str = "Alice";

/// Namespace for seeded hashrelease ids.
const SEED_ID_NAMESPACE: Uuid = Uuid::from_u128(0x5e1d_b0a2_7c3f_4d8e_9a61_0f2b_c4d3_e5a7);

/// Short hashrelease id for a seeded candidate.
///
/// Derived from project and version, so every build of the catalog
/// yields the same ids and an interrupted seed resumes instead of
/// duplicating.
#[must_use]
pub fn seed_hashrelease_id(project: ProjectId, version: &str) -> String {
    let name = format!("{}/{}", project, version);
    Uuid::new_v5(&SEED_ID_NAMESPACE, name.as_bytes())
        .simple()
        .to_string()
        .chars()
        .take(HASHRELEASE_ID_LENGTH)
        .collect()
}

/// Build the seed catalog as of `now`.
#[must_use]
pub fn seed_catalog(now: Timestamp) -> SeedCatalog {
    let mut catalog = SeedCatalog {
        hashreleases: Vec::new(),
        releases: Vec::new(),
    };

    for (project, candidates, releases) in [
        (ProjectId::Oss, &OSS_CANDIDATES, &OSS_RELEASES),
        (ProjectId::Enterprise, &ENTERPRISE_CANDIDATES, &ENTERPRISE_RELEASES),
    ] {
        let project_candidates: Vec<Hashrelease> = candidates
            .iter()
            .map(|entry| {
                let id = seed_hashrelease_id(project, entry.version);
                build_hashrelease(project, entry, id, now)
            })
            .collect();

        for entry in releases {
            let hashrelease_id = project_candidates
                .get(entry.candidate)
                .map(|hr| hr.id.clone())
                .unwrap_or_default();
            catalog
                .releases
                .push(build_release(project, entry, hashrelease_id, now));
        }

        catalog.hashreleases.extend(project_candidates);
    }

    catalog
}

fn build_hashrelease(
    project: ProjectId,
    entry: &CandidateSeed,
    id: String,
    now: Timestamp,
) -> Hashrelease {
    let days = entry.days_ago;
    let component_versions = BTreeMap::from([
        ("api".to_string(), format!("1.{}.0", days)),
        ("ui".to_string(), format!("2.{}.1", days)),
        ("operator".to_string(), format!("0.{}.5", days)),
    ]);

    Hashrelease {
        id,
        project_id: project,
        branch: entry.branch.to_string(),
        version: entry.version.to_string(),
        build_success: entry.build_success,
        test_success: entry.test_success,
        is_ready_for_release: entry.ready,
        component_versions,
        created_at: now - Duration::days(days),
    }
}

fn build_release(
    project: ProjectId,
    entry: &ReleaseSeed,
    hashrelease_id: String,
    now: Timestamp,
) -> Release {
    let started_at = now - Duration::days(entry.days_ago);
    let completed_at = entry
        .complete
        .then(|| now - Duration::days(entry.days_ago - 1));

    let lifecycle = LIFECYCLE_TEMPLATE
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let target = match index {
                0 => StepStatus::Done,
                1 if !entry.complete => StepStatus::InProgress,
                1 | 2 if entry.complete => StepStatus::Done,
                _ => StepStatus::Pending,
            };
            seeded_step(name, target, started_at, completed_at)
        })
        .collect();

    Release {
        id: entry.version.to_string(),
        project_id: project,
        branch: entry.branch.to_string(),
        hashrelease_id,
        version: entry.version.to_string(),
        release_manager: RELEASE_MANAGER.to_string(),
        started_at,
        completed_at,
        lifecycle,
    }
}

/// Walk a fresh step to `target` through the regular stamping rules.
fn seeded_step(
    name: &str,
    target: StepStatus,
    started_at: Timestamp,
    completed_at: Option<Timestamp>,
) -> ReleaseStep {
    let step = ReleaseStep::new(name, StepStatus::Pending);
    match target {
        StepStatus::InProgress => stamp_step(&step, StepStatus::InProgress, started_at),
        StepStatus::Done => {
            let running = stamp_step(&step, StepStatus::InProgress, started_at);
            stamp_step(&running, StepStatus::Done, completed_at.unwrap_or(started_at))
        }
        StepStatus::Pending | StepStatus::Error => step,
    }
}

// =============================================================================
// TESTS
// =============================================================================
