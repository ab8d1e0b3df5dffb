//! In-process store.
//!
//! The whole debit-and-record unit runs under one mutex without yielding, so
//! dropping a caller mid-call never leaves half of it applied. Faults can be
//! injected to exercise the failure paths of the reservation core.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use shared::{Booking, Event, SeatRequest};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::{ReservationStore, SeatClaim};
use crate::error::StoreError;

/// One-shot failure consumed by the next operation it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The next operation of any kind cannot reach the store.
    Unreachable,
    StallLookup(Duration),
    /// The next `reserve_seat` sleeps before touching any state.
    StallReservation(Duration),
    /// The next booking insert fails and the seat debit is undone.
    InsertFails,
    /// The next booking insert fails and undoing the debit fails too.
    InsertAndRollbackFail,
    /// The next `reserve_seat` applies its unit but reports the outcome as unknown.
    CommitUnobserved,
    /// The next `reserve_seat` applies nothing and reports the outcome as unknown.
    CommitLost,
    /// The next `reserve_seat` applies its unit, then sleeps before answering.
    StallAfterCommit(Duration),
    /// The next `find_booking` cannot reach the store.
    BookingLookupFails,
}

#[derive(Default)]
struct State {
    events: HashMap<Uuid, Event>,
    bookings: HashMap<Uuid, Booking>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    faults: Mutex<Vec<Fault>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every operation by `latency` before it touches state.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn insert_event(&self, event: Event) {
        self.state().events.insert(event.id, event);
    }

    pub fn event(&self, event_id: Uuid) -> Option<Event> {
        self.state().events.get(&event_id).cloned()
    }

    pub fn bookings_for(&self, event_id: Uuid) -> Vec<Booking> {
        self.state()
            .bookings
            .values()
            .filter(|booking| booking.event_id == event_id)
            .cloned()
            .collect()
    }

    /// Changes an event's price. Seat counts are left alone.
    pub fn set_price(&self, event_id: Uuid, price: BigDecimal) -> bool {
        match self.state().events.get_mut(&event_id) {
            Some(event) => {
                event.price = price;
                true
            }
            None => false,
        }
    }

    pub fn inject(&self, fault: Fault) {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).push(fault);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_fault(&self, wanted: impl Fn(&Fault) -> bool) -> Option<Fault> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let position = faults.iter().position(wanted)?;
        Some(faults.remove(position))
    }

    async fn enter(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.take_fault(|f| *f == Fault::Unreachable).is_some() {
            return Err(StoreError::Unavailable("memory store marked unreachable".to_string()));
        }
        Ok(())
    }

    /// The debit-and-record unit. Never yields.
    fn apply(&self, request: &SeatRequest, insert_fault: Option<Fault>) -> Result<SeatClaim, StoreError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(event) = state.events.get_mut(&request.event_id) else {
            return Ok(SeatClaim::Exhausted);
        };
        if !event.has_available_seats() {
            return Ok(SeatClaim::Exhausted);
        }

        let previous_update = event.updated_at;
        event.available_seats -= 1;
        event.updated_at = request.requested_at;
        let booking = Booking::confirmed(request, event);

        match insert_fault {
            Some(Fault::InsertFails) => {
                event.available_seats += 1;
                event.updated_at = previous_update;
                warn!(booking_id = %request.booking_id, "booking insert failed, seat debit undone");
                Err(StoreError::Rejected("booking insert failed".to_string()))
            }
            Some(Fault::InsertAndRollbackFail) => Err(StoreError::Inconsistent(format!(
                "booking {} not recorded and seat debit on event {} not undone",
                request.booking_id, request.event_id
            ))),
            _ => {
                state.bookings.insert(booking.id, booking.clone());
                Ok(SeatClaim::Booked(booking))
            }
        }
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn find_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        if let Some(Fault::StallLookup(delay)) =
            self.take_fault(|f| matches!(f, Fault::StallLookup(_)))
        {
            tokio::time::sleep(delay).await;
        }
        self.enter().await?;
        Ok(self.event(event_id))
    }

    async fn reserve_seat(&self, request: &SeatRequest) -> Result<SeatClaim, StoreError> {
        if let Some(Fault::StallReservation(delay)) =
            self.take_fault(|f| matches!(f, Fault::StallReservation(_)))
        {
            tokio::time::sleep(delay).await;
        }
        self.enter().await?;
        let insert_fault =
            self.take_fault(|f| matches!(f, Fault::InsertFails | Fault::InsertAndRollbackFail));
        let answer_fault = self.take_fault(|f| {
            matches!(
                f,
                Fault::CommitUnobserved | Fault::CommitLost | Fault::StallAfterCommit(_)
            )
        });

        if answer_fault == Some(Fault::CommitLost) {
            return Err(StoreError::OutcomeUnknown(
                "connection lost before commit was acknowledged".to_string(),
            ));
        }

        let claim = self.apply(request, insert_fault)?;

        match answer_fault {
            Some(Fault::CommitUnobserved) => Err(StoreError::OutcomeUnknown(
                "connection lost after commit was sent".to_string(),
            )),
            Some(Fault::StallAfterCommit(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(claim)
            }
            _ => Ok(claim),
        }
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        if self.take_fault(|f| *f == Fault::BookingLookupFails).is_some() {
            return Err(StoreError::Unavailable("booking lookup failed".to_string()));
        }
        self.enter().await?;
        Ok(self.state().bookings.get(&booking_id).cloned())
    }
}
