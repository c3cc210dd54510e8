//! # Property-Based Tests
//!
//! Lifecycle invariants checked over arbitrary transition sequences.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use proptest::collection::vec;
use proptest::prelude::*;
use relboard_core::primitives::LIFECYCLE_TEMPLATE;
use relboard_core::{
    ProjectId, Release, ReleaseStep, StepStatus, Timestamp, advance_step, update_step_status,
};

struct FixedClock(Timestamp);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn fresh_release() -> Release {
    Release {
        id: "v1.0.0".to_string(),
        project_id: ProjectId::Oss,
        branch: "release-1.0".to_string(),
        hashrelease_id: "abc1234".to_string(),
        version: "v1.0.0".to_string(),
        release_manager: "Alice".to_string(),
        started_at: base_time(),
        completed_at: None,
        lifecycle: LIFECYCLE_TEMPLATE
            .iter()
            .map(|name| ReleaseStep::new(*name, StepStatus::Pending))
            .collect(),
    }
}

fn status_strategy() -> impl Strategy<Value = StepStatus> {
    prop::sample::select(StepStatus::ALL.to_vec())
}

/// (step index, target status) pairs applied one per minute.
fn transitions() -> impl Strategy<Value = Vec<(usize, StepStatus)>> {
    vec((0..LIFECYCLE_TEMPLATE.len(), status_strategy()), 0..40)
}

fn apply(release: &Release, index: usize, status: StepStatus, minute: i64) -> Release {
    let clock = FixedClock(base_time() + Duration::minutes(minute));
    update_step_status(release, LIFECYCLE_TEMPLATE[index], status, &clock).expect("known step")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Four successive advances return every status to itself.
    #[test]
    fn cycle_closure(status in status_strategy()) {
        let mut current = status;
        for _ in 0..4 {
            current = advance_step(current);
        }
        prop_assert_eq!(current, status);
        prop_assert_ne!(advance_step(status), status);
    }

    /// Timestamps, once set, never change across any later sequence.
    #[test]
    fn capture_once(moves in transitions()) {
        let mut release = fresh_release();

        for (minute, (index, status)) in moves.into_iter().enumerate() {
            let before = release.lifecycle[index].clone();
            release = apply(&release, index, status, minute as i64);
            let after = &release.lifecycle[index];

            prop_assert_eq!(after.status, status);
            if before.started_at.is_some() {
                prop_assert_eq!(after.started_at, before.started_at);
            }
            if before.completed_at.is_some() {
                prop_assert_eq!(after.completed_at, before.completed_at);
            }
        }
    }

    /// A timestamp exists exactly when the step has visited the matching status.
    #[test]
    fn timestamps_track_history(moves in transitions()) {
        let mut release = fresh_release();
        let mut visited_in_progress = [false; LIFECYCLE_TEMPLATE.len()];
        let mut visited_done = [false; LIFECYCLE_TEMPLATE.len()];

        for (minute, (index, status)) in moves.into_iter().enumerate() {
            release = apply(&release, index, status, minute as i64);
            visited_in_progress[index] |= status == StepStatus::InProgress;
            visited_done[index] |= status == StepStatus::Done;
        }

        for (i, step) in release.lifecycle.iter().enumerate() {
            prop_assert_eq!(step.started_at.is_some(), visited_in_progress[i]);
            prop_assert_eq!(step.completed_at.is_some(), visited_done[i]);
        }
    }

    /// Updating one step leaves every other step and the release header alone.
    #[test]
    fn isolation(
        moves in transitions(),
        target in 0..LIFECYCLE_TEMPLATE.len(),
        status in status_strategy(),
    ) {
        let mut release = fresh_release();
        for (minute, (index, s)) in moves.into_iter().enumerate() {
            release = apply(&release, index, s, minute as i64);
        }

        let updated = apply(&release, target, status, 1000);

        for (i, (old, new)) in release.lifecycle.iter().zip(&updated.lifecycle).enumerate() {
            if i != target {
                prop_assert_eq!(old, new);
            }
        }
        prop_assert_eq!(&updated.id, &release.id);
        prop_assert_eq!(updated.started_at, release.started_at);
        prop_assert_eq!(updated.completed_at, release.completed_at);
        prop_assert_eq!(&updated.hashrelease_id, &release.hashrelease_id);
    }

    /// Length, names and order of the lifecycle never change.
    #[test]
    fn shape_preserved(moves in transitions()) {
        let mut release = fresh_release();
        for (minute, (index, status)) in moves.into_iter().enumerate() {
            release = apply(&release, index, status, minute as i64);
            prop_assert_eq!(
                release.step_names().collect::<Vec<_>>(),
                LIFECYCLE_TEMPLATE.to_vec()
            );
        }
    }
}
