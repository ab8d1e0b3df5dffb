//! Seat reservation service.
//!
//! [`ReservationService::reserve`] debits one seat of an event and records a
//! confirmed booking for it, without ever overselling under concurrent
//! attempts.

pub mod api;
pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod reservation;
pub mod schema;
pub mod store;

pub use error::{ReservationError, StoreError};
pub use gate::InventoryGate;
pub use reservation::{ReservationConfig, ReservationService};
