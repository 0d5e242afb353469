use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Prices are minor currency units (fixed-point)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Showtime {
    pub showtime_id: i64,
    pub movie_id: i64,
    pub cinema_id: i64,
    pub start_time: DateTime<Utc>,
    pub ticket_price: i64,
    pub capacity: i32,
    pub available_seats: i32,
}

/// Showtime counters next to the value recomputed from occupancy rows.
///
/// `available_seats` is a cache maintained by the reservation engine;
/// `derived_available_seats` is `capacity - count(booked_seats)`. The two
/// only diverge if occupancy rows are touched outside the engine.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShowtimeAvailability {
    #[serde(flatten)]
    pub showtime: Showtime,
    pub booked_seats: i64,
    pub derived_available_seats: i64,
}

impl ShowtimeAvailability {
    pub fn new(showtime: Showtime, booked_seats: i64) -> Self {
        let derived_available_seats = i64::from(showtime.capacity) - booked_seats;
        Self { showtime, booked_seats, derived_available_seats }
    }

    pub fn is_consistent(&self) -> bool {
        i64::from(self.showtime.available_seats) == self.derived_available_seats
    }
}
