use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use num_traits::Zero;
use shared::{Booking, Event, UnknownStatus};
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Identifiable, Insertable)]
#[diesel(table_name = crate::schema::events)]
pub struct DbEvent {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub price: BigDecimal,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: String,
    pub category: String,
    pub image_url: String,
    pub organizer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct DbBooking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub tickets: i32,
    pub total_price: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error(transparent)]
    Status(#[from] UnknownStatus),

    #[error("event {0} has a negative price")]
    NegativePrice(Uuid),
}

impl TryFrom<DbEvent> for Event {
    type Error = RowError;

    fn try_from(row: DbEvent) -> Result<Self, Self::Error> {
        if row.price < BigDecimal::zero() {
            return Err(RowError::NegativePrice(row.id));
        }

        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            location: row.location,
            starts_at: row.starts_at,
            price: row.price,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            status: row.status.parse()?,
            category: row.category,
            image_url: row.image_url,
            organizer_id: row.organizer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Event> for DbEvent {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            starts_at: event.starts_at,
            price: event.price.clone(),
            total_seats: event.total_seats,
            available_seats: event.available_seats,
            status: event.status.as_str().to_string(),
            category: event.category.clone(),
            image_url: event.image_url.clone(),
            organizer_id: event.organizer_id,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

impl From<&Booking> for DbBooking {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            event_id: booking.event_id,
            tickets: booking.tickets,
            total_price: booking.total_price.clone(),
            status: booking.status.as_str().to_string(),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

impl TryFrom<DbBooking> for Booking {
    type Error = RowError;

    fn try_from(row: DbBooking) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            event_id: row.event_id,
            tickets: row.tickets,
            total_price: row.total_price,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
