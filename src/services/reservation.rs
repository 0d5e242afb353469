//! Seat reservation engine.
//!
//! `reserve` runs the whole protocol inside one ledger session:
//!
//! 1. validate the selection (no session is opened for bad input)
//! 2. lock the requested seats in sorted order, then read their occupancy
//! 3. abort with `SeatConflict` naming every seat already sold
//! 4. read the ticket price, abort with `ShowtimeNotFound` if missing
//! 5. insert the booking, one occupancy row per seat, decrement the counter
//! 6. commit
//!
//! Any storage error aborts the session and surfaces as `System`. Nothing is
//! retried here; retry policy belongs to the caller.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::BookingConfig;
use crate::ledger::{LedgerSession, LedgerStore, StoreError};
use crate::models::NewBooking;

pub const MAX_SEAT_LABEL_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("invalid reservation: {0}")]
    Validation(String),

    #[error("seats already booked: {}", .seats.join(", "))]
    SeatConflict { seats: Vec<String> },

    #[error("showtime {0} not found")]
    ShowtimeNotFound(i64),

    #[error("showtime {showtime_id} has fewer than {requested} seats left")]
    InsufficientCapacity { showtime_id: i64, requested: usize },

    #[error("storage failure: {0}")]
    System(#[from] StoreError),
}

/// Validated seat labels: non-empty, distinct, sorted.
///
/// Sorting gives every reservation the same lock order, so two requests with
/// interleaved seat sets cannot deadlock each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatSelection {
    labels: Vec<String>,
}

impl SeatSelection {
    pub fn new(labels: Vec<String>, max_seats: usize) -> Result<Self, ReservationError> {
        if labels.is_empty() {
            return Err(ReservationError::Validation(
                "at least one seat must be selected".to_string(),
            ));
        }
        if labels.len() > max_seats {
            return Err(ReservationError::Validation(format!(
                "at most {max_seats} seats can be booked at once"
            )));
        }

        for label in &labels {
            if label.trim().is_empty() {
                return Err(ReservationError::Validation("seat labels must not be blank".to_string()));
            }
            if label.trim() != label {
                return Err(ReservationError::Validation(format!(
                    "seat label {label:?} has surrounding whitespace"
                )));
            }
            if label.chars().count() > MAX_SEAT_LABEL_LEN {
                return Err(ReservationError::Validation(format!(
                    "seat label {label:?} is longer than {MAX_SEAT_LABEL_LEN} characters"
                )));
            }
        }

        let mut labels = labels;
        labels.sort();

        let mut duplicates: Vec<String> = labels
            .windows(2)
            .filter(|pair| pair[0] == pair[1])
            .map(|pair| pair[0].clone())
            .collect();
        if !duplicates.is_empty() {
            duplicates.dedup();
            return Err(ReservationError::Validation(format!(
                "seat selected more than once: {}",
                duplicates.join(", ")
            )));
        }

        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub booking_id: i64,
    pub showtime_id: i64,
    pub seats: Vec<String>,
    pub total_amount: i64,
}

#[derive(Clone)]
pub struct ReservationEngine<S> {
    store: S,
    max_seats_per_booking: usize,
}

impl<S: LedgerStore> ReservationEngine<S> {
    pub fn new(store: S, config: &BookingConfig) -> Self {
        Self {
            store,
            max_seats_per_booking: config.max_seats_per_booking,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn reserve(
        &self,
        user_id: i64,
        showtime_id: i64,
        seats: Vec<String>,
    ) -> Result<BookingReceipt, ReservationError> {
        if user_id <= 0 {
            return Err(ReservationError::Validation("user id must be > 0".to_string()));
        }
        if showtime_id <= 0 {
            return Err(ReservationError::Validation("showtime_id must be > 0".to_string()));
        }
        let selection = SeatSelection::new(seats, self.max_seats_per_booking)?;

        let mut session = self.store.begin().await?;
        match Self::reserve_in(&mut session, user_id, showtime_id, &selection).await {
            Ok(receipt) => {
                session.commit().await?;
                info!(
                    booking_id = receipt.booking_id,
                    showtime_id,
                    user_id,
                    seats = selection.len(),
                    "booking committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    warn!(showtime_id, error = %rollback_err, "rollback failed, session discarded");
                }
                debug!(showtime_id, user_id, error = %err, "reservation aborted");
                Err(err)
            }
        }
    }

    async fn reserve_in(
        session: &mut S::Session,
        user_id: i64,
        showtime_id: i64,
        selection: &SeatSelection,
    ) -> Result<BookingReceipt, ReservationError> {
        let occupied = session.lock_seats(showtime_id, selection.labels()).await?;
        if !occupied.is_empty() {
            return Err(ReservationError::SeatConflict { seats: occupied });
        }

        // Price lookup happens before any insert
        let ticket_price = session
            .ticket_price(showtime_id)
            .await?
            .ok_or(ReservationError::ShowtimeNotFound(showtime_id))?;

        let seat_count = i32::try_from(selection.len())
            .map_err(|_| ReservationError::Validation("too many seats".to_string()))?;
        let total_amount = ticket_price
            .checked_mul(i64::from(seat_count))
            .ok_or_else(|| ReservationError::Validation("total amount overflows".to_string()))?;

        let seats = selection.labels().to_vec();
        let booking_id = session
            .insert_booking(&NewBooking {
                user_id,
                showtime_id,
                total_amount,
                seats: seats.clone(),
            })
            .await?;
        session
            .insert_booked_seats(booking_id, showtime_id, selection.labels())
            .await?;

        if !session.take_available_seats(showtime_id, seat_count).await? {
            return Err(ReservationError::InsufficientCapacity {
                showtime_id,
                requested: selection.len(),
            });
        }

        Ok(BookingReceipt {
            booking_id,
            showtime_id,
            seats,
            total_amount,
        })
    }
}
