//! Failure kinds reported by the reservation core and its stores.

use thiserror::Error;
use uuid::Uuid;

/// Outcome of a reservation attempt that did not produce a booking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: Uuid },

    #[error("Event sold out: {event_id}")]
    SoldOut { event_id: Uuid },

    #[error("Timed out during {stage}")]
    Timeout { stage: Stage },

    /// A seat may have been debited without a booking to show for it.
    #[error("Inconsistent state for event {event_id}, booking {booking_id}: {detail}")]
    InconsistentState {
        event_id: Uuid,
        booking_id: Uuid,
        detail: String,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The store refused the operation and rolled it back; nothing was applied.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Step of a reservation attempt, used to label timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Gate,
    Lookup,
    Reserve,
    Reconcile,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Gate => write!(f, "gate acquisition"),
            Stage::Lookup => write!(f, "event lookup"),
            Stage::Reserve => write!(f, "seat reservation"),
            Stage::Reconcile => write!(f, "reservation reconciliation"),
        }
    }
}

/// Failures raised by a [`crate::store::ReservationStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unavailable(String),

    #[error("store operation timed out")]
    Timeout,

    #[error("operation rejected and rolled back: {0}")]
    Rejected(String),

    /// The commit was attempted but its result was never observed.
    #[error("outcome unknown: {0}")]
    OutcomeUnknown(String),

    #[error("seat debited without booking: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, ReservationError>;

impl ReservationError {
    /// Expected outcomes that callers report back to the user as-is.
    pub fn is_business_failure(&self) -> bool {
        matches!(
            self,
            ReservationError::EventNotFound { .. } | ReservationError::SoldOut { .. }
        )
    }

    pub fn is_infrastructure_fault(&self) -> bool {
        !self.is_business_failure()
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReservationError::EventNotFound { .. } => ErrorSeverity::Info,
            ReservationError::SoldOut { .. } => ErrorSeverity::Info,
            ReservationError::Timeout { .. } => ErrorSeverity::Warning,
            ReservationError::StorageUnavailable(_) => ErrorSeverity::Error,
            ReservationError::Storage(_) => ErrorSeverity::Error,
            ReservationError::InconsistentState { .. } => ErrorSeverity::Critical,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
