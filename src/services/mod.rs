pub mod reservation;
pub mod event_reservation;

pub use event_reservation::{EventBookingReceipt, EventReservationEngine, EventReservationError};
pub use reservation::{BookingReceipt, ReservationEngine, ReservationError, SeatSelection};
