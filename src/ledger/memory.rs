//! In-memory ledger used as a test double for the reservation engines.
//!
//! It keeps the same concurrency contract as the Postgres ledger: one async
//! mutex per `(showtime, seat)` taken in sorted order, one per showtime
//! counter taken on decrement, writes buffered in the session and applied
//! atomically on commit with the unique `(showtime, seat)` rule re-checked.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{LedgerSession, LedgerStore, StoreError};
use crate::models::{Booking, EventBooking, NewBooking, NewEventBooking, Showtime};

/// Session step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    LockSeats,
    TicketPrice,
    InsertBooking,
    InsertBookedSeats,
    TakeAvailableSeats,
    InsertEventBooking,
    Commit,
}

#[derive(Default)]
struct State {
    showtimes: HashMap<i64, Showtime>,
    events: HashSet<i64>,
    bookings: BTreeMap<i64, Booking>,
    booked_seats: BTreeMap<(i64, String), i64>,
    event_bookings: BTreeMap<i64, EventBooking>,
}

struct LockTable<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Clone> LockTable<K> {
    fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    fn handle(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.clone()).or_default().clone()
    }

    // Drops the entry once no session holds or waits on it
    fn release(&self, key: &K) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(key).is_some_and(|handle| Arc::strong_count(handle) == 1) {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

struct Inner {
    state: Mutex<State>,
    seat_locks: LockTable<(i64, String)>,
    counter_locks: LockTable<i64>,
    ids: AtomicI64,
    fail_point: Mutex<Option<FailPoint>>,
}

#[derive(Clone)]
pub struct InMemoryLedger {
    inner: Arc<Inner>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                seat_locks: LockTable::new(),
                counter_locks: LockTable::new(),
                ids: AtomicI64::new(0),
                fail_point: Mutex::new(None),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> i64 {
        self.inner.ids.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register a showtime starting tomorrow with `capacity` free seats.
    pub fn add_showtime(&self, capacity: i32, ticket_price: i64) -> i64 {
        let showtime_id = self.next_id();
        let showtime = Showtime {
            showtime_id,
            movie_id: 1,
            cinema_id: 1,
            start_time: Utc::now() + Duration::days(1),
            ticket_price,
            capacity,
            available_seats: capacity,
        };
        self.state().showtimes.insert(showtime_id, showtime);
        showtime_id
    }

    pub fn add_event(&self) -> i64 {
        let event_id = self.next_id();
        self.state().events.insert(event_id);
        event_id
    }

    /// Make the next session call at `point` fail with `StoreError::Unavailable`.
    pub fn fail_next(&self, point: FailPoint) {
        *self.inner.fail_point.lock().unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    pub fn event_bookings(&self) -> Vec<EventBooking> {
        self.state().event_bookings.values().cloned().collect()
    }

    pub fn booking_count(&self) -> usize {
        self.state().bookings.len()
    }

    fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut armed = self.inner.fail_point.lock().unwrap_or_else(PoisonError::into_inner);
        if *armed == Some(point) {
            *armed = None;
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

enum PendingWrite {
    Booking(Booking),
    BookedSeat { showtime_id: i64, seat_label: String, booking_id: i64 },
    TakeSeats { showtime_id: i64, count: i32 },
    EventBooking(EventBooking),
}

pub struct InMemorySession {
    ledger: InMemoryLedger,
    // Released when the session is dropped, after commit has applied its writes
    guards: Vec<OwnedMutexGuard<()>>,
    held_seats: HashSet<(i64, String)>,
    held_counters: HashSet<i64>,
    pending: Vec<PendingWrite>,
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.guards.clear();
        let inner = &self.ledger.inner;
        for key in &self.held_seats {
            inner.seat_locks.release(key);
        }
        for showtime_id in &self.held_counters {
            inner.counter_locks.release(showtime_id);
        }
    }
}

impl InMemorySession {
    fn pending_taken(&self, showtime_id: i64) -> i32 {
        self.pending
            .iter()
            .map(|write| match write {
                PendingWrite::TakeSeats { showtime_id: id, count } if *id == showtime_id => *count,
                _ => 0,
            })
            .sum()
    }
}

impl LedgerStore for InMemoryLedger {
    type Session = InMemorySession;

    async fn begin(&self) -> Result<InMemorySession, StoreError> {
        self.trip(FailPoint::Begin)?;
        Ok(InMemorySession {
            ledger: self.clone(),
            guards: Vec::new(),
            held_seats: HashSet::new(),
            held_counters: HashSet::new(),
            pending: Vec::new(),
        })
    }

    async fn occupied_seats(&self, showtime_id: i64) -> Result<Vec<String>, StoreError> {
        Ok(self
            .state()
            .booked_seats
            .keys()
            .filter(|(id, _)| *id == showtime_id)
            .map(|(_, label)| label.clone())
            .collect())
    }

    async fn showtime(&self, showtime_id: i64) -> Result<Option<Showtime>, StoreError> {
        Ok(self.state().showtimes.get(&showtime_id).cloned())
    }

    async fn booked_seat_count(&self, showtime_id: i64) -> Result<i64, StoreError> {
        let count = self
            .state()
            .booked_seats
            .keys()
            .filter(|(id, _)| *id == showtime_id)
            .count();
        Ok(count as i64)
    }

    async fn bookings_for_showtime(&self, showtime_id: i64) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .state()
            .bookings
            .values()
            .filter(|booking| booking.showtime_id == showtime_id)
            .cloned()
            .collect())
    }
}

impl LedgerSession for InMemorySession {
    async fn lock_seats(&mut self, showtime_id: i64, seats: &[String]) -> Result<Vec<String>, StoreError> {
        self.ledger.trip(FailPoint::LockSeats)?;

        let mut keys: Vec<(i64, String)> = seats
            .iter()
            .map(|label| (showtime_id, label.clone()))
            .collect();
        keys.sort();
        keys.dedup();

        for key in &keys {
            if self.held_seats.contains(key) {
                continue;
            }
            let handle = self.ledger.inner.seat_locks.handle(key);
            self.guards.push(handle.lock_owned().await);
            self.held_seats.insert(key.clone());
        }

        let state = self.ledger.state();
        Ok(keys
            .into_iter()
            .filter(|key| state.booked_seats.contains_key(key))
            .map(|(_, label)| label)
            .collect())
    }

    async fn ticket_price(&mut self, showtime_id: i64) -> Result<Option<i64>, StoreError> {
        self.ledger.trip(FailPoint::TicketPrice)?;
        Ok(self
            .ledger
            .state()
            .showtimes
            .get(&showtime_id)
            .map(|showtime| showtime.ticket_price))
    }

    async fn insert_booking(&mut self, booking: &NewBooking) -> Result<i64, StoreError> {
        self.ledger.trip(FailPoint::InsertBooking)?;
        if !self.ledger.state().showtimes.contains_key(&booking.showtime_id) {
            return Err(StoreError::Constraint("bookings_showtime_id_fkey".to_string()));
        }

        let booking_id = self.ledger.next_id();
        self.pending.push(PendingWrite::Booking(Booking {
            booking_id,
            user_id: booking.user_id,
            showtime_id: booking.showtime_id,
            total_amount: booking.total_amount,
            seats: booking.seats.clone(),
            booking_time: Utc::now(),
        }));
        Ok(booking_id)
    }

    async fn insert_booked_seats(
        &mut self,
        booking_id: i64,
        showtime_id: i64,
        seats: &[String],
    ) -> Result<(), StoreError> {
        self.ledger.trip(FailPoint::InsertBookedSeats)?;
        for label in seats {
            self.pending.push(PendingWrite::BookedSeat {
                showtime_id,
                seat_label: label.clone(),
                booking_id,
            });
        }
        Ok(())
    }

    async fn take_available_seats(&mut self, showtime_id: i64, count: i32) -> Result<bool, StoreError> {
        self.ledger.trip(FailPoint::TakeAvailableSeats)?;

        // Row-lock equivalent: held until the session ends
        if self.held_counters.insert(showtime_id) {
            let handle = self.ledger.inner.counter_locks.handle(&showtime_id);
            self.guards.push(handle.lock_owned().await);
        }

        let available = match self.ledger.state().showtimes.get(&showtime_id) {
            Some(showtime) => showtime.available_seats,
            None => return Ok(false),
        };
        if available - self.pending_taken(showtime_id) < count {
            return Ok(false);
        }

        self.pending.push(PendingWrite::TakeSeats { showtime_id, count });
        Ok(true)
    }

    async fn insert_event_booking(&mut self, booking: &NewEventBooking) -> Result<i64, StoreError> {
        self.ledger.trip(FailPoint::InsertEventBooking)?;
        if !self.ledger.state().events.contains(&booking.event_id) {
            return Err(StoreError::Constraint("event_bookings_event_id_fkey".to_string()));
        }

        let event_booking_id = self.ledger.next_id();
        self.pending.push(PendingWrite::EventBooking(EventBooking {
            event_booking_id,
            user_id: booking.user_id,
            event_id: booking.event_id,
            number_of_tickets: booking.number_of_tickets,
            total_amount: booking.total_amount,
            booking_time: Utc::now(),
        }));
        Ok(event_booking_id)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.ledger.trip(FailPoint::Commit)?;
        let mut state = self.ledger.state();

        // Validate everything first so a rejected commit applies nothing
        let mut new_seats = HashSet::new();
        let mut taken: HashMap<i64, i32> = HashMap::new();
        for write in &self.pending {
            match write {
                PendingWrite::BookedSeat { showtime_id, seat_label, .. } => {
                    let key = (*showtime_id, seat_label.clone());
                    if state.booked_seats.contains_key(&key) || !new_seats.insert(key) {
                        return Err(StoreError::Constraint("uq_booked_seats_showtime_seat".to_string()));
                    }
                }
                PendingWrite::TakeSeats { showtime_id, count } => {
                    *taken.entry(*showtime_id).or_default() += count;
                }
                PendingWrite::Booking(_) | PendingWrite::EventBooking(_) => {}
            }
        }
        for (showtime_id, count) in &taken {
            let available = state.showtimes.get(showtime_id).map_or(0, |s| s.available_seats);
            if available < *count {
                return Err(StoreError::Constraint("ck_showtimes_available_seats".to_string()));
            }
        }

        for write in std::mem::take(&mut self.pending) {
            match write {
                PendingWrite::Booking(booking) => {
                    state.bookings.insert(booking.booking_id, booking);
                }
                PendingWrite::BookedSeat { showtime_id, seat_label, booking_id } => {
                    state.booked_seats.insert((showtime_id, seat_label), booking_id);
                }
                PendingWrite::TakeSeats { showtime_id, count } => {
                    if let Some(showtime) = state.showtimes.get_mut(&showtime_id) {
                        showtime.available_seats -= count;
                    }
                }
                PendingWrite::EventBooking(booking) => {
                    state.event_bookings.insert(booking.event_booking_id, booking);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
