//! Capacity ledger: occupancy rows, the per-showtime seat counter, and the
//! transactional sessions the reservation engines run inside.
//!
//! A [`LedgerStore`] hands out [`LedgerSession`]s. A session is a single
//! atomic unit: every write made through it becomes visible on
//! [`LedgerSession::commit`] or not at all. Dropping a session without
//! committing discards its writes and releases its locks, so every exit path
//! (including `?` and panics) releases the session.

use std::future::Future;

use crate::models::{Booking, NewBooking, NewEventBooking, Showtime};

pub mod memory;
pub mod postgres;

pub use memory::{FailPoint, InMemoryLedger};
pub use postgres::PgLedger;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A schema constraint rejected a write (unique, foreign key, check).
    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            use sqlx::error::ErrorKind;
            if matches!(
                db_err.kind(),
                ErrorKind::UniqueViolation | ErrorKind::ForeignKeyViolation | ErrorKind::CheckViolation
            ) {
                return StoreError::Constraint(db_err.constraint().unwrap_or("unknown").to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Session provider plus the lock-free read side of the ledger.
pub trait LedgerStore: Clone + Send + Sync + 'static {
    type Session: LedgerSession;

    /// Open a transactional session.
    fn begin(&self) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;

    /// Committed seat labels for a showtime, sorted. Takes no locks.
    fn occupied_seats(
        &self,
        showtime_id: i64,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    fn showtime(
        &self,
        showtime_id: i64,
    ) -> impl Future<Output = Result<Option<Showtime>, StoreError>> + Send;

    fn booked_seat_count(
        &self,
        showtime_id: i64,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn bookings_for_showtime(
        &self,
        showtime_id: i64,
    ) -> impl Future<Output = Result<Vec<Booking>, StoreError>> + Send;
}

/// One open transaction against the ledger.
pub trait LedgerSession: Send {
    /// Take exclusive per-seat locks for `seats` on `showtime_id`, then return
    /// the labels among them that are already occupied.
    ///
    /// Locks are acquired in a fixed total order and held until the session
    /// ends. The occupancy read happens after every lock is granted and sees
    /// all rows committed up to that point.
    fn lock_seats(
        &mut self,
        showtime_id: i64,
        seats: &[String],
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// `None` when the showtime does not exist.
    fn ticket_price(
        &mut self,
        showtime_id: i64,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    fn insert_booking(
        &mut self,
        booking: &NewBooking,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn insert_booked_seats(
        &mut self,
        booking_id: i64,
        showtime_id: i64,
        seats: &[String],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Decrement `available_seats` by `count`. Returns `false`, changing
    /// nothing, when fewer than `count` seats remain.
    fn take_available_seats(
        &mut self,
        showtime_id: i64,
        count: i32,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn insert_event_booking(
        &mut self,
        booking: &NewEventBooking,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
