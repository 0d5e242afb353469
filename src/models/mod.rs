pub mod showtime;
pub mod booking;
pub mod event_booking;

pub use showtime::{Showtime, ShowtimeAvailability};
pub use booking::{Booking, BookingHistoryEntry, NewBooking};
pub use event_booking::{EventBooking, NewEventBooking};
