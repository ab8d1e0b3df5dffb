use async_trait::async_trait;
use bb8::{ErrorSink, PooledConnection, RunError};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::{bb8::Pool, AsyncDieselConnectionManager, PoolError};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::{Booking, Event, SeatRequest};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ReservationStore, SeatClaim};
use crate::error::StoreError;
use crate::models::*;
use crate::schema::*;

pub type DbPool = Pool<AsyncPgConnection>;
type DbConnection<'a> = PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Remembers the last error the pool hit while opening a connection.
///
/// bb8 retries failed connects until the checkout deadline and then only
/// reports `TimedOut`, so this is what tells a down database apart from a
/// busy one.
#[derive(Debug, Clone, Default)]
pub struct ConnectErrors {
    last: Arc<Mutex<Option<String>>>,
}

impl ConnectErrors {
    pub fn last(&self) -> Option<String> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn clear(&self) {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl ErrorSink<PoolError> for ConnectErrors {
    fn sink(&self, error: PoolError) {
        warn!("Database connection failed: {}", error);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());
    }

    fn boxed_clone(&self) -> Box<dyn ErrorSink<PoolError>> {
        Box::new(self.clone())
    }
}

/// PostgreSQL store. The debit and the insert share one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    connect_errors: ConnectErrors,
    statement_timeout: Duration,
}

impl PgStore {
    /// Builds the pool for `database_url`. Checkouts wait at most
    /// `statement_timeout`, the same bound the server applies to statements.
    /// A refused connect is recorded at once instead of being retried until
    /// the checkout gives up.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        statement_timeout: Duration,
    ) -> Result<Self, PoolError> {
        let connect_errors = ConnectErrors::default();
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(statement_timeout)
            .retry_connection(false)
            .error_sink(Box::new(connect_errors.clone()))
            .build(manager)
            .await?;

        Ok(Self {
            pool,
            connect_errors,
            statement_timeout,
        })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn connection(&self) -> Result<DbConnection<'_>, StoreError> {
        match self.pool.get().await {
            Ok(conn) => {
                self.connect_errors.clear();
                Ok(conn)
            }
            Err(err) => Err(checkout_failure(
                err,
                self.pool.state().connections,
                self.connect_errors.last(),
            )),
        }
    }

    async fn reserve_in_transaction(
        &self,
        conn: &mut AsyncPgConnection,
        request: &SeatRequest,
    ) -> Result<SeatClaim, StoreError> {
        let request = request.clone();
        let set_timeout = format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        );

        conn.transaction::<_, StoreError, _>(|conn| {
            Box::pin(async move {
                diesel::sql_query(set_timeout).execute(conn).await?;

                let debited = diesel::update(
                    events::table
                        .filter(events::id.eq(request.event_id))
                        .filter(events::available_seats.gt(0)),
                )
                .set((
                    events::available_seats.eq(events::available_seats - 1),
                    events::updated_at.eq(request.requested_at),
                ))
                .get_result::<DbEvent>(conn)
                .await
                .optional()?;

                let Some(row) = debited else {
                    return Ok(SeatClaim::Exhausted);
                };
                let event = Event::try_from(row).map_err(|e| StoreError::Rejected(e.to_string()))?;

                let booking = Booking::confirmed(&request, &event);
                let new_booking = DbBooking::from(&booking);
                diesel::insert_into(bookings::table)
                    .values(&new_booking)
                    .execute(conn)
                    .await?;

                Ok(SeatClaim::Booked(booking))
            })
        })
        .await
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn find_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        let mut conn = self.connection().await?;

        let row = events::table
            .find(event_id)
            .first::<DbEvent>(&mut conn)
            .await
            .optional()?;

        row.map(Event::try_from)
            .transpose()
            .map_err(|e| StoreError::Rejected(e.to_string()))
    }

    async fn reserve_seat(&self, request: &SeatRequest) -> Result<SeatClaim, StoreError> {
        let mut conn = self.connection().await?;

        let claim = self.reserve_in_transaction(&mut conn, request).await?;
        match &claim {
            SeatClaim::Booked(booking) => {
                info!("Booking {} committed for event {}", booking.id, booking.event_id)
            }
            SeatClaim::Exhausted => debug!("No seat left for event {}", request.event_id),
        }
        Ok(claim)
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let mut conn = self.connection().await?;

        let row = bookings::table
            .find(booking_id)
            .first::<DbBooking>(&mut conn)
            .await
            .optional()?;

        row.map(Booking::try_from)
            .transpose()
            .map_err(|e| StoreError::Rejected(e.to_string()))
    }
}

/// A checkout that timed out while the pool holds no connection at all and
/// the last connect attempt failed means the database cannot be reached.
fn checkout_failure(
    err: RunError<PoolError>,
    live_connections: u32,
    last_connect_error: Option<String>,
) -> StoreError {
    match (err, last_connect_error) {
        (RunError::User(e), _) => StoreError::Unavailable(e.to_string()),
        (RunError::TimedOut, Some(detail)) if live_connections == 0 => StoreError::Unavailable(detail),
        (RunError::TimedOut, _) => StoreError::Timeout,
    }
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match &err {
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                StoreError::Unavailable(info.message().to_string())
            }
            DieselError::DatabaseError(_, info) if info.message().contains("statement timeout") => {
                StoreError::Timeout
            }
            DieselError::RollbackErrorOnCommit { .. } | DieselError::BrokenTransactionManager => {
                StoreError::OutcomeUnknown(err.to_string())
            }
            _ => StoreError::Rejected(err.to_string()),
        }
    }
}
