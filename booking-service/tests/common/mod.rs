#![allow(dead_code)]

use bigdecimal::BigDecimal;
use booking_service::store::MemoryStore;
use booking_service::{ReservationConfig, ReservationService};
use chrono::Utc;
use shared::{Event, EventStatus};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub fn event(total_seats: i32, available_seats: i32, price: &str) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: "Summer Swing Festival".to_string(),
        description: "Three bands, one night".to_string(),
        location: "Riverside Pavilion".to_string(),
        starts_at: now + chrono::Duration::days(30),
        price: BigDecimal::from_str(price).unwrap(),
        total_seats,
        available_seats,
        status: EventStatus::Active,
        category: "music".to_string(),
        image_url: "https://example.com/festival.png".to_string(),
        organizer_id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    }
}

pub fn service(store: Arc<MemoryStore>) -> ReservationService {
    ReservationService::new(store, ReservationConfig::default())
}

pub fn service_with(store: Arc<MemoryStore>, storage_timeout: Duration, serialize_per_event: bool) -> ReservationService {
    ReservationService::new(
        store,
        ReservationConfig {
            storage_timeout,
            serialize_per_event,
        },
    )
}

/// Bookings recorded for the event match the seats debited from it.
pub fn assert_ledger_balanced(store: &MemoryStore, event_id: Uuid) {
    let event = store.event(event_id).expect("event exists");
    assert!(event.available_seats >= 0);
    assert_eq!(store.bookings_for(event_id).len() as i32, event.seats_taken());
}
