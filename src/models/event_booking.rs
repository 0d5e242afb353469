use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct EventBooking {
    pub event_booking_id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub number_of_tickets: i32,
    pub total_amount: i64,
    pub booking_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEventBooking {
    pub user_id: i64,
    pub event_id: i64,
    pub number_of_tickets: i32,
    pub total_amount: i64,
}
