//! Per-event exclusion for reservation attempts.
//!
//! Attempts on the same event run one at a time; attempts on different events
//! never wait on each other. One lock is created per event on first use and is
//! kept for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InventoryGate {
    locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Exclusive hold on one event. Dropping it releases the event.
#[must_use = "the event is released as soon as the permit is dropped"]
pub struct EventPermit {
    event_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl InventoryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder owns `event_id`.
    ///
    /// Cancel safe: a caller dropped while waiting never acquires the permit.
    pub async fn acquire(&self, event_id: Uuid) -> EventPermit {
        let lock = self.lock_for(event_id);
        let guard = lock.lock_owned().await;
        debug!(%event_id, "event permit acquired");
        EventPermit { event_id, _guard: guard }
    }

    pub fn release(&self, permit: EventPermit) {
        drop(permit);
    }

    /// Number of events that have a lock record.
    pub fn tracked_events(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn lock_for(&self, event_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        // The map lock is only held to look up or insert, never across an await.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(event_id).or_default().clone()
    }
}

impl EventPermit {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }
}

impl Drop for EventPermit {
    fn drop(&mut self) {
        debug!(event_id = %self.event_id, "event permit released");
    }
}
