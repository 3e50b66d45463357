//! Tests for best-effort dispatch of propagation instructions.

use super::fixtures::{id, status, step};
use crate::propagation::{
    adapters::memory::InMemoryTracker,
    domain::{
        EntityId, EntityRef, InstructionReason, InstructionTarget, OutcomeKind,
        PropagationInstruction, StatusCode, StepName,
    },
    ports::{TrackedEntity, TrackerError, TrackerResult, TrackingService},
    services::PropagationDispatcher,
};
use async_trait::async_trait;
use mockall::{Sequence, mock};
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::time::Duration;

mock! {
    Tracker {}

    #[async_trait]
    impl TrackingService for Tracker {
        async fn find_entity(&self, entity: EntityRef) -> TrackerResult<Option<TrackedEntity>>;
        async fn find_step_tasks(
            &self,
            shot: EntityId,
            steps: &[StepName],
        ) -> TrackerResult<Vec<TrackedEntity>>;
        async fn update_status(&self, entity: EntityRef, status: &StatusCode) -> TrackerResult<()>;
    }
}

fn set(entity: EntityRef, key: &str) -> PropagationInstruction {
    PropagationInstruction::for_entity(entity, status(key), InstructionReason::VersionCreated)
}

fn fanout(shot: u64, exclude: u64) -> PropagationInstruction {
    PropagationInstruction::new(
        InstructionTarget::StepTasks {
            shot: id(shot),
            steps: vec![step("Composite"), step("Secondary Composite")],
            exclude: Some(id(exclude)),
        },
        status("bfr"),
        InstructionReason::StepFanout {
            step: step("Rotoscoping"),
        },
    )
}

fn task_on_shot(task: u64, step_name: &str, current: &str) -> TrackedEntity {
    TrackedEntity::new(EntityRef::task(id(task)))
        .with_status(status(current))
        .with_step(step(step_name))
        .with_shot(id(7))
}

#[fixture]
fn shot_tracker() -> InMemoryTracker {
    InMemoryTracker::from_entities([
        TrackedEntity::new(EntityRef::shot(id(7))).with_status(status("wtg")),
        TrackedEntity::new(EntityRef::shot(id(8))).with_status(status("wtg")),
        task_on_shot(101, "Rotoscoping", "stcomp"),
        task_on_shot(102, "Composite", "wtg"),
        task_on_shot(103, "Secondary Composite", "ip"),
        task_on_shot(104, "Composite", "bfr"),
        task_on_shot(105, "Lighting", "wtg"),
    ])
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn applies_status_and_records_previous(shot_tracker: InMemoryTracker) {
    let tracker = Arc::new(shot_tracker);
    let dispatcher = PropagationDispatcher::new(Arc::clone(&tracker));

    let report = dispatcher.dispatch(&[set(EntityRef::shot(id(7)), "ip")]).await;

    assert_eq!(
        report.outcomes().first().map(|outcome| outcome.kind().clone()),
        Some(OutcomeKind::Applied {
            previous: Some(status("wtg")),
        })
    );
    assert_eq!(
        tracker.status_of(EntityRef::shot(id(7))).expect("lock"),
        Some(status("ip"))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn satisfied_target_is_not_rewritten(shot_tracker: InMemoryTracker) {
    let tracker = Arc::new(shot_tracker);
    let dispatcher = PropagationDispatcher::new(Arc::clone(&tracker));
    let instruction = set(EntityRef::shot(id(7)), "ip").with_satisfied_by([status("ip"), status("wtg")]);

    let report = dispatcher.dispatch(&[instruction]).await;

    assert_eq!(report.summary().already_satisfied, 1);
    assert!(tracker.writes().expect("lock").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_target_is_reported(shot_tracker: InMemoryTracker) {
    let dispatcher = PropagationDispatcher::new(Arc::new(shot_tracker));
    let report = dispatcher.dispatch(&[set(EntityRef::shot(id(99)), "ip")]).await;
    assert_eq!(report.summary().target_missing, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fanout_updates_sibling_step_tasks_only(shot_tracker: InMemoryTracker) {
    let tracker = Arc::new(shot_tracker);
    let dispatcher = PropagationDispatcher::new(Arc::clone(&tracker));

    let report = dispatcher.dispatch(&[fanout(7, 101)]).await;

    assert_eq!(
        tracker.writes().expect("lock"),
        vec![
            (EntityRef::task(id(102)), status("bfr")),
            (EntityRef::task(id(103)), status("bfr")),
        ]
    );
    let summary = report.summary();
    assert_eq!(summary.applied, 2);
    assert_eq!(summary.already_satisfied, 1);
    assert_eq!(
        tracker.status_of(EntityRef::task(id(105))).expect("lock"),
        Some(status("wtg"))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_failure_does_not_block_the_rest(shot_tracker: InMemoryTracker) {
    shot_tracker
        .fail_writes_for(EntityRef::shot(id(7)))
        .expect("lock");
    let tracker = Arc::new(shot_tracker);
    let dispatcher = PropagationDispatcher::new(Arc::clone(&tracker));
    let instructions = [
        set(EntityRef::shot(id(7)), "ip"),
        set(EntityRef::shot(id(8)), "ip"),
        fanout(7, 101),
    ];

    let report = dispatcher.dispatch(&instructions).await;

    let summary = report.summary();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.applied, 3);
    assert!(matches!(
        report.outcomes().first().map(|outcome| outcome.kind()),
        Some(OutcomeKind::Failed { .. })
    ));
    assert_eq!(
        tracker.status_of(EntityRef::shot(id(8))).expect("lock"),
        Some(status("ip"))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_search_is_recorded_without_entity(shot_tracker: InMemoryTracker) {
    shot_tracker
        .fail_reads_for(EntityRef::shot(id(7)))
        .expect("lock");
    let dispatcher = PropagationDispatcher::new(Arc::new(shot_tracker));

    let report = dispatcher.dispatch(&[fanout(7, 101)]).await;

    let [outcome] = report.outcomes() else {
        panic!("expected one outcome, got {:?}", report.outcomes());
    };
    assert_eq!(outcome.entity(), None);
    assert!(matches!(outcome.kind(), OutcomeKind::Failed { .. }));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn instructions_execute_in_order() {
    let mut tracker = MockTracker::new();
    let mut sequence = Sequence::new();
    for target in [EntityRef::shot(id(7)), EntityRef::task(id(101))] {
        tracker
            .expect_find_entity()
            .withf(move |entity| *entity == target)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|entity| Ok(Some(TrackedEntity::new(entity).with_status(status("wtg")))));
        tracker
            .expect_update_status()
            .withf(move |entity, _| *entity == target)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));
    }
    let dispatcher = PropagationDispatcher::new(Arc::new(tracker));

    let report = dispatcher
        .dispatch(&[
            set(EntityRef::shot(id(7)), "ip"),
            set(EntityRef::task(id(101)), "apv"),
        ])
        .await;

    assert_eq!(report.summary().applied, 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn read_error_is_recorded_as_failure() {
    let mut tracker = MockTracker::new();
    tracker
        .expect_find_entity()
        .times(1)
        .returning(|_| Err(TrackerError::Timeout));
    tracker.expect_update_status().never();
    let dispatcher = PropagationDispatcher::new(Arc::new(tracker));

    let report = dispatcher.dispatch(&[set(EntityRef::shot(id(7)), "ip")]).await;

    assert_eq!(
        report.outcomes().first().map(|outcome| outcome.kind().clone()),
        Some(OutcomeKind::Failed {
            error: TrackerError::Timeout.to_string(),
        })
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_deadline_marks_everything_not_attempted() {
    let tracker = MockTracker::new();
    let dispatcher = PropagationDispatcher::new(Arc::new(tracker)).with_timeout(Duration::ZERO);

    let report = dispatcher
        .dispatch(&[set(EntityRef::shot(id(7)), "ip"), fanout(7, 101)])
        .await;

    let summary = report.summary();
    assert_eq!(summary.not_attempted, 2);
    assert!(!summary.is_complete());
}

/// Delegates to an in-memory tracker but stalls writes to one entity.
struct StallingTracker {
    inner: InMemoryTracker,
    stalled: EntityRef,
    stall: Duration,
}

#[async_trait]
impl TrackingService for StallingTracker {
    async fn find_entity(&self, entity: EntityRef) -> TrackerResult<Option<TrackedEntity>> {
        self.inner.find_entity(entity).await
    }

    async fn find_step_tasks(
        &self,
        shot: EntityId,
        steps: &[StepName],
    ) -> TrackerResult<Vec<TrackedEntity>> {
        self.inner.find_step_tasks(shot, steps).await
    }

    async fn update_status(&self, entity: EntityRef, status: &StatusCode) -> TrackerResult<()> {
        if entity == self.stalled {
            tokio::time::sleep(self.stall).await;
        }
        self.inner.update_status(entity, status).await
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deadline_passing_mid_batch_keeps_applied_and_skips_the_rest(
    shot_tracker: InMemoryTracker,
) {
    let tracker = Arc::new(StallingTracker {
        inner: shot_tracker,
        stalled: EntityRef::task(id(102)),
        stall: Duration::from_millis(500),
    });
    let dispatcher = PropagationDispatcher::new(Arc::clone(&tracker))
        .with_timeout(Duration::from_millis(100));

    let report = dispatcher
        .dispatch(&[
            set(EntityRef::shot(id(7)), "ip"),
            set(EntityRef::task(id(102)), "bfr"),
            set(EntityRef::shot(id(8)), "ip"),
        ])
        .await;

    let kinds: Vec<OutcomeKind> = report
        .outcomes()
        .iter()
        .map(|outcome| outcome.kind().clone())
        .collect();
    assert_eq!(
        kinds,
        vec![
            OutcomeKind::Applied {
                previous: Some(status("wtg")),
            },
            OutcomeKind::Failed {
                error: TrackerError::Timeout.to_string(),
            },
            OutcomeKind::NotAttempted,
        ]
    );
    assert_eq!(
        tracker.inner.status_of(EntityRef::shot(id(7))).expect("lock"),
        Some(status("ip"))
    );
    assert_eq!(
        tracker.inner.status_of(EntityRef::task(id(102))).expect("lock"),
        Some(status("wtg"))
    );
    assert_eq!(
        tracker.inner.status_of(EntityRef::shot(id(8))).expect("lock"),
        Some(status("wtg"))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_batch_makes_no_calls(shot_tracker: InMemoryTracker) {
    let tracker = Arc::new(shot_tracker);
    let dispatcher = PropagationDispatcher::new(Arc::clone(&tracker));

    let report = dispatcher.dispatch(&[]).await;

    assert!(report.outcomes().is_empty());
    assert_eq!(tracker.call_count().expect("lock"), 0);
}
