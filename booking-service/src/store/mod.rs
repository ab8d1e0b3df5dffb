pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::{Booking, Event, SeatRequest};
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::{Fault, MemoryStore};
pub use postgres::PgStore;

/// Result of the atomic debit-and-record unit.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatClaim {
    Booked(Booking),
    /// No seat was left when the conditional decrement ran; nothing was written.
    Exhausted,
}

/// Durable storage for events and bookings.
///
/// `reserve_seat` is the only way to change an event's available seats.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn find_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Debits one seat of `request.event_id` if any remain and records the
    /// booking, as a single unit: both writes are applied or neither is.
    async fn reserve_seat(&self, request: &SeatRequest) -> Result<SeatClaim, StoreError>;

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;
}
