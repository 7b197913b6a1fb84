//! In-memory implementation of every storage trait.
//!
//! All three tables live behind one `RwLock`, so each operation is atomic with respect
//! to every other. Uniqueness constraints and optimistic versions are checked inside the
//! write lock, which makes the store a faithful stand-in for a transactional database.

use booking_core::store::{
    BookingRepository, Constraint, EventRepository, StoreError, StoreFuture, UserDirectory,
};
use booking_core::{
    Booking, BookingId, EntityKind, Event, EventId, EventStatus, ListingKey, User, UserId,
    UserRole, Version,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
    bookings: HashMap<BookingId, Booking>,
}

impl Tables {
    fn listing_taken(&self, key: &ListingKey, except: Option<EventId>) -> bool {
        self.events
            .values()
            .any(|event| Some(event.id) != except && event.listing_key() == *key)
    }

    fn active_booking(&self, user_id: UserId, event_id: EventId) -> Option<&Booking> {
        self.bookings.values().find(|booking| {
            booking.user_id == user_id && booking.event_id == event_id && booking.is_active()
        })
    }
}

/// In-memory store for fast, deterministic tests.
///
/// Cloning is cheap and clones share the same tables.
///
/// # Example
///
/// ```
/// use booking_testing::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// assert_eq!(store.booking_count(), 0);
///
/// // Simulate an outage: every subsequent call fails with `StoreError::Unavailable`
/// store.set_unavailable(true);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`] (or succeed
    /// again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Change a user's role in place, as a privileged administrative action would.
    ///
    /// Returns `false` if the user does not exist.
    pub fn set_user_role(&self, user_id: UserId, role: UserRole) -> bool {
        let Ok(mut tables) = self.write() else {
            return false;
        };
        tables.users.get_mut(&user_id).is_some_and(|user| {
            user.role = role;
            true
        })
    }

    /// Insert an event bypassing every check (for seeding fixtures such as past events).
    pub fn seed_event(&self, event: Event) {
        if let Ok(mut tables) = self.write() {
            tables.events.insert(event.id, event);
        }
    }

    /// Number of stored bookings (any status)
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.read().map_or(0, |tables| tables.bookings.len())
    }

    /// Number of stored events
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.read().map_or(0, |tables| tables.events.len())
    }

    /// Sum of tickets over non-cancelled bookings for `event_id`
    #[must_use]
    pub fn active_tickets(&self, event_id: EventId) -> u64 {
        self.read().map_or(0, |tables| {
            tables
                .bookings
                .values()
                .filter(|booking| booking.event_id == event_id && booking.is_active())
                .map(|booking| u64::from(booking.ticket_count))
                .sum()
        })
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.check_available()?;
        self.tables
            .read()
            .map_err(|_| StoreError::DatabaseError("table lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.check_available()?;
        self.tables
            .write()
            .map_err(|_| StoreError::DatabaseError("table lock poisoned".to_string()))
    }

    fn query<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Tables) -> T,
    {
        Ok(f(&*self.read()?))
    }
}

fn ready<'a, T: Send + 'a>(result: Result<T, StoreError>) -> StoreFuture<'a, T> {
    Box::pin(std::future::ready(result))
}

fn sorted_events(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by(|a, b| {
        a.details
            .starts_at
            .cmp(&b.details.starts_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    events
}

fn sorted_bookings(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by(|a, b| a.booked_at.cmp(&b.booked_at).then_with(|| a.id.cmp(&b.id)));
    bookings
}

impl UserDirectory for InMemoryStore {
    fn find_user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
        ready(self.query(|tables| tables.users.get(&id).cloned()))
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        ready(self.query(|tables| {
            tables
                .users
                .values()
                .find(|user| user.email.eq_ignore_ascii_case(email))
                .cloned()
        }))
    }

    fn list_users(&self) -> StoreFuture<'_, Vec<User>> {
        ready(self.query(|tables| {
            let mut users: Vec<User> = tables.users.values().cloned().collect();
            users.sort_by(|a, b| {
                a.registered_at
                    .cmp(&b.registered_at)
                    .then_with(|| a.username.cmp(&b.username))
            });
            users
        }))
    }

    fn insert_user(&self, user: User) -> StoreFuture<'_, User> {
        let result = self.write().and_then(|mut tables| {
            if tables
                .users
                .values()
                .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
            {
                return Err(StoreError::UniqueViolation {
                    constraint: Constraint::UserEmail,
                });
            }
            if tables
                .users
                .values()
                .any(|existing| existing.username == user.username)
            {
                return Err(StoreError::UniqueViolation {
                    constraint: Constraint::Username,
                });
            }
            if tables.users.contains_key(&user.id) {
                return Err(StoreError::DatabaseError(format!(
                    "duplicate primary key for user {}",
                    user.id
                )));
            }
            tables.users.insert(user.id, user.clone());
            Ok(user)
        });
        ready(result)
    }
}

impl EventRepository for InMemoryStore {
    fn find_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        ready(self.query(|tables| tables.events.get(&id).cloned()))
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        ready(self.query(|tables| sorted_events(tables.events.values().cloned().collect())))
    }

    fn list_events_by_status(&self, status: EventStatus) -> StoreFuture<'_, Vec<Event>> {
        ready(self.query(|tables| {
            sorted_events(
                tables
                    .events
                    .values()
                    .filter(|event| event.status == status)
                    .cloned()
                    .collect(),
            )
        }))
    }

    fn list_events_by_owner(&self, owner_id: UserId) -> StoreFuture<'_, Vec<Event>> {
        ready(self.query(|tables| {
            sorted_events(
                tables
                    .events
                    .values()
                    .filter(|event| event.owner_id == owner_id)
                    .cloned()
                    .collect(),
            )
        }))
    }

    fn list_events_starting_after(&self, instant: DateTime<Utc>) -> StoreFuture<'_, Vec<Event>> {
        ready(self.query(|tables| {
            sorted_events(
                tables
                    .events
                    .values()
                    .filter(|event| event.details.starts_at > instant)
                    .cloned()
                    .collect(),
            )
        }))
    }

    fn listing_exists<'a>(&'a self, key: &'a ListingKey) -> StoreFuture<'a, bool> {
        ready(self.query(|tables| tables.listing_taken(key, None)))
    }

    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event> {
        let result = self.write().and_then(|mut tables| {
            if tables.listing_taken(&event.listing_key(), None) {
                return Err(StoreError::UniqueViolation {
                    constraint: Constraint::EventListing,
                });
            }
            if tables.events.contains_key(&event.id) {
                return Err(StoreError::DatabaseError(format!(
                    "duplicate primary key for event {}",
                    event.id
                )));
            }
            tables.events.insert(event.id, event.clone());
            Ok(event)
        });
        ready(result)
    }

    fn update_event(&self, event: Event, expected: Version) -> StoreFuture<'_, Event> {
        let result = self.write().and_then(|mut tables| {
            let Some(current) = tables.events.get(&event.id) else {
                return Err(StoreError::RecordMissing {
                    entity: EntityKind::Event,
                    id: *event.id.as_uuid(),
                });
            };
            if current.version != expected {
                return Err(StoreError::ConcurrencyConflict {
                    entity: EntityKind::Event,
                    id: *event.id.as_uuid(),
                    expected,
                    actual: current.version,
                });
            }
            if tables.listing_taken(&event.listing_key(), Some(event.id)) {
                return Err(StoreError::UniqueViolation {
                    constraint: Constraint::EventListing,
                });
            }
            let stored = Event {
                version: expected.next(),
                ..event
            };
            tables.events.insert(stored.id, stored.clone());
            Ok(stored)
        });
        ready(result)
    }
}

impl BookingRepository for InMemoryStore {
    fn find_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        ready(self.query(|tables| tables.bookings.get(&id).cloned()))
    }

    fn list_bookings_by_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Booking>> {
        ready(self.query(|tables| {
            sorted_bookings(
                tables
                    .bookings
                    .values()
                    .filter(|booking| booking.user_id == user_id)
                    .cloned()
                    .collect(),
            )
        }))
    }

    fn list_bookings_by_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Booking>> {
        ready(self.query(|tables| {
            sorted_bookings(
                tables
                    .bookings
                    .values()
                    .filter(|booking| booking.event_id == event_id)
                    .cloned()
                    .collect(),
            )
        }))
    }

    fn list_active_bookings_by_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Booking>> {
        ready(self.query(|tables| {
            sorted_bookings(
                tables
                    .bookings
                    .values()
                    .filter(|booking| booking.event_id == event_id && booking.is_active())
                    .cloned()
                    .collect(),
            )
        }))
    }

    fn find_active_booking(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> StoreFuture<'_, Option<Booking>> {
        ready(self.query(|tables| tables.active_booking(user_id, event_id).cloned()))
    }

    fn insert_booking(&self, booking: Booking) -> StoreFuture<'_, Booking> {
        let result = self.write().and_then(|mut tables| {
            if booking.is_active()
                && tables
                    .active_booking(booking.user_id, booking.event_id)
                    .is_some()
            {
                return Err(StoreError::UniqueViolation {
                    constraint: Constraint::ActiveBooking,
                });
            }
            if tables.bookings.contains_key(&booking.id) {
                return Err(StoreError::DatabaseError(format!(
                    "duplicate primary key for booking {}",
                    booking.id
                )));
            }
            tables.bookings.insert(booking.id, booking.clone());
            Ok(booking)
        });
        ready(result)
    }

    fn update_booking(&self, booking: Booking, expected: Version) -> StoreFuture<'_, Booking> {
        let result = self.write().and_then(|mut tables| {
            let Some(current) = tables.bookings.get(&booking.id) else {
                return Err(StoreError::RecordMissing {
                    entity: EntityKind::Booking,
                    id: *booking.id.as_uuid(),
                });
            };
            if current.version != expected {
                return Err(StoreError::ConcurrencyConflict {
                    entity: EntityKind::Booking,
                    id: *booking.id.as_uuid(),
                    expected,
                    actual: current.version,
                });
            }
            let duplicate = tables
                .active_booking(booking.user_id, booking.event_id)
                .is_some_and(|active| active.id != booking.id);
            if booking.is_active() && duplicate {
                return Err(StoreError::UniqueViolation {
                    constraint: Constraint::ActiveBooking,
                });
            }
            let stored = Booking {
                version: expected.next(),
                ..booking
            };
            tables.bookings.insert(stored.id, stored.clone());
            Ok(stored)
        });
        ready(result)
    }
}
