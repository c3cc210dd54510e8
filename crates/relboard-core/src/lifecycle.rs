//! # Lifecycle Step Transitions
//!
//! The only state machine in relboard: moving one step of a release's
//! lifecycle to a new status and stamping its timestamps.
//!
//! ## Stamping Rules
//!
//! - `started_at` is written the first time a step enters `in-progress`
//! - `completed_at` is written the first time a step enters `done`
//! - Once written, neither is ever overwritten, whatever the later cycle
//!
//! Transitions never mutate their input. A new `Release` is built with the
//! patched step, so a reader holding the previous value keeps a consistent
//! snapshot. Persisting the result is the caller's job.

use crate::{Release, ReleaseStep, RelboardError, StepStatus, Timestamp};
use mockable::Clock;

/// Next status in the fixed cycle `pending → in-progress → done → error → pending`.
#[must_use]
pub const fn advance_step(current: StepStatus) -> StepStatus {
    current.successor()
}

/// Apply `status` to a single step, stamping timestamps at `now` where the
/// capture-once rules allow it.
#[must_use]
pub fn stamp_step(step: &ReleaseStep, status: StepStatus, now: Timestamp) -> ReleaseStep {
    let mut updated = ReleaseStep {
        status,
        ..step.clone()
    };

    if status == StepStatus::InProgress && updated.started_at.is_none() {
        updated.started_at = Some(now);
    }
    if status == StepStatus::Done && updated.completed_at.is_none() {
        updated.completed_at = Some(now);
    }

    updated
}

/// Set the status of the step named `step_name` and return the updated release.
///
/// The clock is read once per call. Every other step, and every field of the
/// release outside `lifecycle`, is carried over untouched.
///
/// # Errors
///
/// Returns `RelboardError::StepNotFound` if no step has exactly this name.
pub fn update_step_status<C: Clock + ?Sized>(
    release: &Release,
    step_name: &str,
    status: StepStatus,
    clock: &C,
) -> Result<Release, RelboardError> {
    if release.step(step_name).is_none() {
        return Err(RelboardError::StepNotFound {
            release: release.id.clone(),
            step: step_name.to_string(),
        });
    }

    let now = clock.utc();
    let lifecycle = release
        .lifecycle
        .iter()
        .map(|step| {
            if step.name == step_name {
                stamp_step(step, status, now)
            } else {
                step.clone()
            }
        })
        .collect();

    Ok(Release {
        id: release.id.clone(),
        project_id: release.project_id,
        branch: release.branch.clone(),
        hashrelease_id: release.hashrelease_id.clone(),
        version: release.version.clone(),
        release_manager: release.release_manager.clone(),
        started_at: release.started_at,
        completed_at: release.completed_at,
        lifecycle,
    })
}

/// Move the named step to the successor of its current status.
///
/// # Errors
///
/// Returns `RelboardError::StepNotFound` if no step has exactly this name.
pub fn advance_release_step<C: Clock + ?Sized>(
    release: &Release,
    step_name: &str,
    clock: &C,
) -> Result<Release, RelboardError> {
    let current = release
        .step(step_name)
        .map(|step| step.status)
        .ok_or_else(|| RelboardError::StepNotFound {
            release: release.id.clone(),
            step: step_name.to_string(),
        })?;

    update_step_status(release, step_name, advance_step(current), clock)
}

// =============================================================================
// TESTS
// =============================================================================
