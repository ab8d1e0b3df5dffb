//! Seat reservation: one seat debited and one booking recorded per call.

use shared::{Booking, SeatRequest};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ErrorSeverity, ReservationError, Result, Stage, StoreError};
use crate::gate::InventoryGate;
use crate::store::{ReservationStore, SeatClaim};

pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ReservationConfig {
    /// Deadline for a whole reservation attempt, gate wait included.
    pub storage_timeout: Duration,
    /// Serialize attempts per event in-process. The store's conditional
    /// decrement alone already prevents overselling.
    pub serialize_per_event: bool,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            serialize_per_event: true,
        }
    }
}

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn ReservationStore>,
    gate: InventoryGate,
    config: ReservationConfig,
}

impl ReservationService {
    pub fn new(store: Arc<dyn ReservationStore>, config: ReservationConfig) -> Self {
        Self {
            store,
            gate: InventoryGate::new(),
            config,
        }
    }

    pub fn gate(&self) -> &InventoryGate {
        &self.gate
    }

    /// Reserves one seat of `event_id` for `user_id`.
    ///
    /// Both identifiers are expected to be well formed already. Dropping the
    /// returned future releases the event and never leaves a debited seat
    /// without its booking.
    pub async fn reserve(&self, user_id: Uuid, event_id: Uuid) -> Result<Booking> {
        let deadline = Instant::now() + self.config.storage_timeout;

        let permit = if self.config.serialize_per_event {
            match within(deadline, Stage::Gate, self.gate.acquire(event_id)).await {
                Ok(permit) => Some(permit),
                Err(err) => {
                    let outcome = Err(err);
                    log_outcome(user_id, event_id, &outcome);
                    return outcome;
                }
            }
        } else {
            None
        };

        let outcome = self.reserve_exclusive(user_id, event_id, deadline).await;

        if let Some(permit) = permit {
            self.gate.release(permit);
        }
        log_outcome(user_id, event_id, &outcome);
        outcome
    }

    async fn reserve_exclusive(&self, user_id: Uuid, event_id: Uuid, deadline: Instant) -> Result<Booking> {
        let event = within(deadline, Stage::Lookup, self.store.find_event(event_id))
            .await?
            .map_err(|e| store_failure(e, Stage::Lookup))?
            .ok_or(ReservationError::EventNotFound { event_id })?;

        if !event.has_available_seats() {
            return Err(ReservationError::SoldOut { event_id });
        }

        let request = SeatRequest::new(user_id, event_id);
        match within(deadline, Stage::Reserve, self.store.reserve_seat(&request)).await {
            Ok(Ok(SeatClaim::Booked(booking))) => Ok(booking),
            Ok(Ok(SeatClaim::Exhausted)) => {
                warn!(%event_id, %user_id, "seat taken between check and debit");
                Err(ReservationError::SoldOut { event_id })
            }
            Ok(Err(StoreError::Inconsistent(detail))) => Err(ReservationError::InconsistentState {
                event_id,
                booking_id: request.booking_id,
                detail,
            }),
            Ok(Err(StoreError::OutcomeUnknown(detail))) => {
                self.reconcile(&request, ReservationError::Storage(detail)).await
            }
            Ok(Err(err)) => Err(store_failure(err, Stage::Reserve)),
            Err(timed_out) => self.reconcile(&request, timed_out).await,
        }
    }

    /// Re-reads the booking of an attempt whose commit was not observed.
    /// `unresolved` is returned when the store shows nothing was applied.
    async fn reconcile(&self, request: &SeatRequest, unresolved: ReservationError) -> Result<Booking> {
        warn!(
            booking_id = %request.booking_id,
            event_id = %request.event_id,
            "reservation outcome unknown, re-reading booking"
        );

        let inconsistent = |detail: String| ReservationError::InconsistentState {
            event_id: request.event_id,
            booking_id: request.booking_id,
            detail,
        };

        match timeout(self.config.storage_timeout, self.store.find_booking(request.booking_id)).await {
            Ok(Ok(Some(booking))) => {
                info!(booking_id = %booking.id, "reservation was committed");
                Ok(booking)
            }
            Ok(Ok(None)) => Err(unresolved),
            Ok(Err(err)) => Err(inconsistent(format!("outcome could not be confirmed: {err}"))),
            Err(_) => Err(inconsistent(format!(
                "outcome could not be confirmed: {} timed out",
                Stage::Reconcile
            ))),
        }
    }
}

async fn within<F: Future>(deadline: Instant, stage: Stage, fut: F) -> Result<F::Output> {
    timeout_at(deadline, fut)
        .await
        .map_err(|_| ReservationError::Timeout { stage })
}

fn store_failure(err: StoreError, stage: Stage) -> ReservationError {
    match err {
        StoreError::Unavailable(detail) => ReservationError::StorageUnavailable(detail),
        StoreError::Timeout => ReservationError::Timeout { stage },
        StoreError::Rejected(detail)
        | StoreError::OutcomeUnknown(detail)
        | StoreError::Inconsistent(detail) => ReservationError::Storage(detail),
    }
}

fn log_outcome(user_id: Uuid, event_id: Uuid, outcome: &Result<Booking>) {
    let err = match outcome {
        Ok(booking) => {
            info!(%user_id, %event_id, booking_id = %booking.id, "seat reserved");
            return;
        }
        Err(err) => err,
    };

    match err.severity() {
        ErrorSeverity::Info => info!(%user_id, %event_id, error = %err, "reservation refused"),
        ErrorSeverity::Warning => warn!(%user_id, %event_id, error = %err, "reservation abandoned"),
        ErrorSeverity::Error => error!(%user_id, %event_id, error = %err, "reservation failed"),
        ErrorSeverity::Critical => error!(
            %user_id,
            %event_id,
            error = %err,
            "seat inventory inconsistent, operator action required"
        ),
    }
}
