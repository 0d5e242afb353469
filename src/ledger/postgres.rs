use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};

use super::{LedgerSession, LedgerStore, StoreError};
use crate::models::{Booking, BookingHistoryEntry, NewBooking, NewEventBooking, Showtime};

/// Postgres-backed ledger.
///
/// Seat locks are transaction-scoped advisory locks keyed by
/// `(showtime_id, seat_label)`. Row locks alone cannot serialize two
/// reservations of a seat nobody holds yet: `SELECT ... FOR UPDATE` on a
/// missing row locks nothing. The advisory key exists whether or not the
/// seat is sold, which gives per-seat granularity.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn booking_history(&self, user_id: i64) -> Result<Vec<BookingHistoryEntry>, StoreError> {
        let rows = sqlx::query_as::<_, BookingHistoryEntry>(
            r#"
            SELECT
                b.booking_id,
                b.showtime_id,
                m.title AS movie_title,
                c.name AS cinema_name,
                s.start_time,
                b.total_amount,
                b.seats,
                b.booking_time
            FROM bookings b
            JOIN showtimes s ON s.showtime_id = b.showtime_id
            JOIN movies m ON m.movie_id = s.movie_id
            JOIN cinemas c ON c.cinema_id = s.cinema_id
            WHERE b.user_id = $1
            ORDER BY s.start_time DESC, b.booking_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Advisory lock key for one seat. The showtime id is hashed as a fixed
/// eight bytes, so distinct `(showtime, label)` pairs never share input.
pub(crate) fn seat_lock_key(showtime_id: i64, seat_label: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(b"booked_seat:");
    hasher.update(showtime_id.to_be_bytes());
    hasher.update(seat_label.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix)
}

// Sorted and deduplicated: every session acquires keys in the same order
pub(crate) fn seat_lock_keys(showtime_id: i64, seats: &[String]) -> Vec<i64> {
    let mut keys: Vec<i64> = seats
        .iter()
        .map(|label| seat_lock_key(showtime_id, label))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

impl LedgerStore for PgLedger {
    type Session = PgSession;

    async fn begin(&self) -> Result<PgSession, StoreError> {
        let mut tx = self.pool.begin().await?;
        // Under REPEATABLE READ the snapshot would predate the seat locks
        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await?;
        Ok(PgSession { tx })
    }

    async fn occupied_seats(&self, showtime_id: i64) -> Result<Vec<String>, StoreError> {
        let seats = sqlx::query_scalar::<_, String>(
            "SELECT seat_label FROM booked_seats WHERE showtime_id = $1 ORDER BY seat_label",
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(seats)
    }

    async fn showtime(&self, showtime_id: i64) -> Result<Option<Showtime>, StoreError> {
        let showtime = sqlx::query_as::<_, Showtime>(
            "SELECT showtime_id, movie_id, cinema_id, start_time, ticket_price, capacity, available_seats
             FROM showtimes
             WHERE showtime_id = $1",
        )
        .bind(showtime_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(showtime)
    }

    async fn booked_seat_count(&self, showtime_id: i64) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM booked_seats WHERE showtime_id = $1",
        )
        .bind(showtime_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn bookings_for_showtime(&self, showtime_id: i64) -> Result<Vec<Booking>, StoreError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT booking_id, user_id, showtime_id, total_amount, seats, booking_time
             FROM bookings
             WHERE showtime_id = $1
             ORDER BY booking_id",
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }
}

impl LedgerSession for PgSession {
    async fn lock_seats(&mut self, showtime_id: i64, seats: &[String]) -> Result<Vec<String>, StoreError> {
        for key in seat_lock_keys(showtime_id, seats) {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(key)
                .execute(&mut *self.tx)
                .await?;
        }

        // New statement, new snapshot: sees everything committed before the locks were granted
        let occupied = sqlx::query_scalar::<_, String>(
            r#"
            SELECT seat_label
            FROM booked_seats
            WHERE showtime_id = $1 AND seat_label = ANY($2)
            ORDER BY seat_label
            FOR UPDATE
            "#,
        )
        .bind(showtime_id)
        .bind(seats)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(occupied)
    }

    async fn ticket_price(&mut self, showtime_id: i64) -> Result<Option<i64>, StoreError> {
        let price = sqlx::query_scalar::<_, i64>(
            "SELECT ticket_price FROM showtimes WHERE showtime_id = $1",
        )
        .bind(showtime_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(price)
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> Result<i64, StoreError> {
        let booking_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO bookings (user_id, showtime_id, total_amount, seats)
            VALUES ($1, $2, $3, $4)
            RETURNING booking_id
            "#,
        )
        .bind(booking.user_id)
        .bind(booking.showtime_id)
        .bind(booking.total_amount)
        .bind(&booking.seats)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(booking_id)
    }

    async fn insert_booked_seats(
        &mut self,
        booking_id: i64,
        showtime_id: i64,
        seats: &[String],
    ) -> Result<(), StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO booked_seats (booking_id, showtime_id, seat_label)
            SELECT $1, $2, label FROM UNNEST($3::text[]) AS label
            "#,
        )
        .bind(booking_id)
        .bind(showtime_id)
        .bind(seats)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if inserted != seats.len() as u64 {
            return Err(StoreError::Constraint(format!(
                "expected {} booked_seats rows, inserted {}",
                seats.len(),
                inserted
            )));
        }
        Ok(())
    }

    async fn take_available_seats(&mut self, showtime_id: i64, count: i32) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE showtimes
            SET available_seats = available_seats - $1
            WHERE showtime_id = $2 AND available_seats >= $1
            "#,
        )
        .bind(count)
        .bind(showtime_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    async fn insert_event_booking(&mut self, booking: &NewEventBooking) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO event_bookings (user_id, event_id, number_of_tickets, total_amount)
            VALUES ($1, $2, $3, $4)
            RETURNING event_booking_id
            "#,
        )
        .bind(booking.user_id)
        .bind(booking.event_id)
        .bind(booking.number_of_tickets)
        .bind(booking.total_amount)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
