use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Booking {
    pub booking_id: i64,
    pub user_id: i64,
    pub showtime_id: i64,
    pub total_amount: i64,
    pub seats: Vec<String>,
    pub booking_time: DateTime<Utc>,
}

// Row written at step 7 of a reservation; the id comes back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub user_id: i64,
    pub showtime_id: i64,
    pub total_amount: i64,
    pub seats: Vec<String>,
}

// GET /api/users/me/bookings
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingHistoryEntry {
    pub booking_id: i64,
    pub showtime_id: i64,
    pub movie_title: String,
    pub cinema_name: String,
    pub start_time: DateTime<Utc>,
    pub total_amount: i64,
    pub seats: Vec<String>,
    pub booking_time: DateTime<Utc>,
}
