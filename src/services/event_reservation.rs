//! Ticket-count reservations against events.
//!
//! Events are not seat-addressable, so no locks are taken and no capacity is
//! enforced: a reservation is one `event_bookings` row written in its own
//! session. Capacity checks, if events ever get a ticket limit, belong between
//! `begin` and the insert, behind a row lock on the event.

use serde::Serialize;
use tracing::{info, warn};

use crate::ledger::{LedgerSession, LedgerStore, StoreError};
use crate::models::NewEventBooking;

#[derive(Debug, thiserror::Error)]
pub enum EventReservationError {
    #[error("invalid event reservation: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    System(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventBookingReceipt {
    pub booking_id: i64,
    pub event_id: i64,
    pub number_of_tickets: i32,
    pub total_amount: i64,
}

#[derive(Clone)]
pub struct EventReservationEngine<S> {
    store: S,
}

impl<S: LedgerStore> EventReservationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn reserve_event(
        &self,
        user_id: i64,
        event_id: i64,
        number_of_tickets: i32,
        total_amount: i64,
    ) -> Result<EventBookingReceipt, EventReservationError> {
        if user_id <= 0 {
            return Err(EventReservationError::Validation("user id must be > 0".to_string()));
        }
        if event_id <= 0 {
            return Err(EventReservationError::Validation("event_id must be > 0".to_string()));
        }
        if number_of_tickets <= 0 {
            return Err(EventReservationError::Validation(
                "number_of_tickets must be > 0".to_string(),
            ));
        }
        if total_amount <= 0 {
            return Err(EventReservationError::Validation("total_amount must be > 0".to_string()));
        }

        let booking = NewEventBooking {
            user_id,
            event_id,
            number_of_tickets,
            total_amount,
        };

        let mut session = self.store.begin().await?;
        let booking_id = match session.insert_event_booking(&booking).await {
            Ok(id) => id,
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    warn!(event_id, error = %rollback_err, "rollback failed, session discarded");
                }
                return Err(err.into());
            }
        };
        session.commit().await?;

        info!(booking_id, event_id, user_id, number_of_tickets, "event booking committed");
        Ok(EventBookingReceipt {
            booking_id,
            event_id,
            number_of_tickets,
            total_amount,
        })
    }
}
