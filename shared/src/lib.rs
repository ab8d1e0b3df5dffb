use bigdecimal::BigDecimal;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Tickets debited by a single reservation.
pub const TICKETS_PER_BOOKING: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for EventStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EventStatus::Active),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub price: BigDecimal,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: EventStatus,
    pub category: String,
    pub image_url: String,
    pub organizer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn has_available_seats(&self) -> bool {
        self.available_seats > 0
    }

    /// Seats already handed out, which is also the number of bookings that must exist.
    pub fn seats_taken(&self) -> i32 {
        self.total_seats - self.available_seats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub tickets: i32,
    pub total_price: BigDecimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything a store needs to debit one seat and record the booking for it.
///
/// The booking id and the instant are fixed before the store is called, so a
/// caller that lost track of the outcome can look the booking up afterwards.
/// The instant is kept at microsecond precision, the finest the database keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatRequest {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub tickets: i32,
    pub requested_at: DateTime<Utc>,
}

impl SeatRequest {
    pub fn new(user_id: Uuid, event_id: Uuid) -> Self {
        Self {
            booking_id: Uuid::new_v4(),
            user_id,
            event_id,
            tickets: TICKETS_PER_BOOKING,
            requested_at: Utc::now().trunc_subsecs(6),
        }
    }
}

impl Booking {
    /// Builds the confirmed booking for `request` priced from `event` as it
    /// stood when its seat was debited.
    pub fn confirmed(request: &SeatRequest, event: &Event) -> Self {
        Self {
            id: request.booking_id,
            user_id: request.user_id,
            event_id: request.event_id,
            tickets: request.tickets,
            total_price: &event.price * BigDecimal::from(request.tickets),
            status: BookingStatus::Confirmed,
            created_at: request.requested_at,
            updated_at: request.requested_at,
        }
    }
}
