//! Lifecycle tracking for optimistic mutations.
//!
//! Every optimistic write registers its target here before the request
//! goes out, then settles to confirmed or rolled back. The tracker is
//! bookkeeping only; applying and undoing the state change is the
//! caller's job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, warn};

use radar_shared::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Pending,
    Confirmed,
    RolledBack,
}

#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub phase: MutationPhase,
    pub started_at: Instant,
}

/// Tracks at most one mutation per target entity. A new `begin` on the
/// same target replaces whatever record was there.
#[derive(Clone, Default)]
pub struct MutationTracker {
    inner: Arc<Mutex<HashMap<EntityId, MutationRecord>>>,
}

impl MutationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EntityId, MutationRecord>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an in-flight mutation against `target`.
    pub fn begin(&self, target: EntityId) {
        let mut inner = self.lock();
        let record = MutationRecord {
            phase: MutationPhase::Pending,
            started_at: Instant::now(),
        };
        if let Some(previous) = inner.insert(target.clone(), record) {
            if previous.phase == MutationPhase::Pending {
                warn!(target = %target, "Replacing still-pending mutation");
            }
        }
        debug!(target = %target, "Mutation started");
    }

    pub fn confirm(&self, target: &EntityId) -> bool {
        self.settle(target, MutationPhase::Confirmed)
    }

    pub fn roll_back(&self, target: &EntityId) -> bool {
        self.settle(target, MutationPhase::RolledBack)
    }

    fn settle(&self, target: &EntityId, phase: MutationPhase) -> bool {
        let mut inner = self.lock();
        let Some(record) = inner.get_mut(target) else {
            debug!(target = %target, ?phase, "No mutation to settle");
            return false;
        };
        if record.phase != MutationPhase::Pending {
            return false;
        }
        record.phase = phase;
        debug!(target = %target, ?phase, elapsed = ?record.started_at.elapsed(), "Mutation settled");
        true
    }

    pub fn phase(&self, target: &EntityId) -> Option<MutationPhase> {
        self.lock().get(target).map(|record| record.phase)
    }

    /// Number of mutations still awaiting the server.
    pub fn in_flight(&self) -> usize {
        self.lock()
            .values()
            .filter(|record| record.phase == MutationPhase::Pending)
            .count()
    }

    /// Drop settled records, keeping only pending ones.
    pub fn clear_settled(&self) {
        self.lock()
            .retain(|_, record| record.phase == MutationPhase::Pending);
    }
}
