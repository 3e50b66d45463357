//! In-memory tracking service for tests and local simulation.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::propagation::{
    domain::{EntityId, EntityRef, EntityType, StatusCode, StepName},
    ports::{TrackedEntity, TrackerError, TrackerResult, TrackingService},
};

/// Thread-safe in-memory tracking service.
///
/// Writes are applied to the stored snapshots and recorded in order, so tests
/// can assert exactly which entities were touched. Individual entities can be
/// configured to fail reads or writes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    state: Arc<RwLock<InMemoryTrackerState>>,
}

#[derive(Debug, Default)]
struct InMemoryTrackerState {
    entities: HashMap<EntityRef, TrackedEntity>,
    failing_reads: HashSet<EntityRef>,
    failing_writes: HashSet<EntityRef>,
    writes: Vec<(EntityRef, StatusCode)>,
    calls: usize,
}

impl InMemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker seeded with `entities`.
    #[must_use]
    pub fn from_entities(entities: impl IntoIterator<Item = TrackedEntity>) -> Self {
        let state = InMemoryTrackerState {
            entities: entities
                .into_iter()
                .map(|entity| (entity.entity(), entity))
                .collect(),
            ..InMemoryTrackerState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Inserts or replaces an entity snapshot.
    ///
    /// # Errors
    ///
    /// Returns tracker transport errors when lock acquisition fails.
    pub fn insert(&self, entity: TrackedEntity) -> TrackerResult<()> {
        let mut state = self.write_state()?;
        state.entities.insert(entity.entity(), entity);
        Ok(())
    }

    /// Makes every read of `entity` fail.
    ///
    /// # Errors
    ///
    /// Returns tracker transport errors when lock acquisition fails.
    pub fn fail_reads_for(&self, entity: EntityRef) -> TrackerResult<()> {
        self.write_state()?.failing_reads.insert(entity);
        Ok(())
    }

    /// Makes every status write to `entity` fail.
    ///
    /// # Errors
    ///
    /// Returns tracker transport errors when lock acquisition fails.
    pub fn fail_writes_for(&self, entity: EntityRef) -> TrackerResult<()> {
        self.write_state()?.failing_writes.insert(entity);
        Ok(())
    }

    /// Returns the stored status of `entity`.
    ///
    /// # Errors
    ///
    /// Returns tracker transport errors when lock acquisition fails.
    pub fn status_of(&self, entity: EntityRef) -> TrackerResult<Option<StatusCode>> {
        let state = self.read_state()?;
        Ok(state
            .entities
            .get(&entity)
            .and_then(|found| found.status().cloned()))
    }

    /// Returns successful writes in the order they happened.
    ///
    /// # Errors
    ///
    /// Returns tracker transport errors when lock acquisition fails.
    pub fn writes(&self) -> TrackerResult<Vec<(EntityRef, StatusCode)>> {
        Ok(self.read_state()?.writes.clone())
    }

    /// Returns the number of port calls received, successful or not.
    ///
    /// # Errors
    ///
    /// Returns tracker transport errors when lock acquisition fails.
    pub fn call_count(&self) -> TrackerResult<usize> {
        Ok(self.read_state()?.calls)
    }

    fn read_state(&self) -> TrackerResult<RwLockReadGuard<'_, InMemoryTrackerState>> {
        self.state
            .read()
            .map_err(|err| TrackerError::transport(std::io::Error::other(err.to_string())))
    }

    fn write_state(&self) -> TrackerResult<RwLockWriteGuard<'_, InMemoryTrackerState>> {
        self.state
            .write()
            .map_err(|err| TrackerError::transport(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl TrackingService for InMemoryTracker {
    async fn find_entity(&self, entity: EntityRef) -> TrackerResult<Option<TrackedEntity>> {
        let mut state = self.write_state()?;
        state.calls += 1;
        if state.failing_reads.contains(&entity) {
            return Err(TrackerError::Rejected {
                status: 503,
                message: format!("read of {entity} failed"),
            });
        }
        Ok(state.entities.get(&entity).cloned())
    }

    async fn find_step_tasks(
        &self,
        shot: EntityId,
        steps: &[StepName],
    ) -> TrackerResult<Vec<TrackedEntity>> {
        let mut state = self.write_state()?;
        state.calls += 1;
        if state.failing_reads.contains(&EntityRef::shot(shot)) {
            return Err(TrackerError::Rejected {
                status: 503,
                message: format!("task search on shot {shot} failed"),
            });
        }

        let mut tasks: Vec<TrackedEntity> = state
            .entities
            .values()
            .filter(|candidate| {
                candidate.entity().entity_type() == EntityType::Task
                    && candidate.shot() == Some(shot)
                    && candidate.step().is_some_and(|step| steps.contains(step))
            })
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.entity().id());
        Ok(tasks)
    }

    async fn update_status(&self, entity: EntityRef, status: &StatusCode) -> TrackerResult<()> {
        let mut state = self.write_state()?;
        state.calls += 1;
        if state.failing_writes.contains(&entity) {
            return Err(TrackerError::Rejected {
                status: 500,
                message: format!("write to {entity} failed"),
            });
        }

        let stored = state
            .entities
            .get_mut(&entity)
            .ok_or_else(|| TrackerError::Rejected {
                status: 404,
                message: format!("{entity} not found"),
            })?;
        stored.set_status(status.clone());
        state.writes.push((entity, status.clone()));
        Ok(())
    }
}
