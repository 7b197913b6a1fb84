//! Storage collaborator contracts.
//!
//! The engine never talks to a database directly. It consumes three narrow traits:
//!
//! - [`UserDirectory`]: identity resolution and user registration
//! - [`EventRepository`]: event records plus the listing-uniqueness index
//! - [`BookingRepository`]: booking records plus the "active bookings of event E" index
//!
//! # Guarantees required from implementations
//!
//! - Single-record inserts and updates are atomic: they either fully apply or leave
//!   the store untouched.
//! - Updates are optimistic. `update_*` receives the [`Version`] the caller read and
//!   fails with [`StoreError::ConcurrencyConflict`] if the record has moved on.
//! - Uniqueness constraints (user email, event listing, one active booking per user and
//!   event) are enforced on write and reported as [`StoreError::UniqueViolation`].
//!
//! # Dyn Compatibility
//!
//! Like the other storage traits in this workspace, methods return
//! `Pin<Box<dyn Future>>` instead of using `async fn` so the engine can hold
//! `Arc<dyn EventRepository>` and friends.

use crate::error::EntityKind;
use crate::types::{
    Booking, BookingId, Event, EventId, EventStatus, ListingKey, User, UserId, Version,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Boxed future returned by every storage operation
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Uniqueness constraints a store must enforce
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// One user per email
    UserEmail,
    /// One user per username
    Username,
    /// One event per (owner, start, location)
    EventListing,
    /// One non-cancelled booking per (user, event)
    ActiveBooking,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserEmail => "unique_user_email",
            Self::Username => "unique_username",
            Self::EventListing => "unique_owner_start_location",
            Self::ActiveBooking => "unique_active_user_event_booking",
        })
    }
}

/// Errors that can occur during storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// The constraint that fired
        constraint: Constraint,
    },

    /// Optimistic concurrency conflict: expected version doesn't match current version.
    ///
    /// Another writer updated the record between the caller's read and write.
    #[error("Concurrency conflict on {entity} {id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Kind of record
        entity: EntityKind,
        /// Record identifier
        id: Uuid,
        /// The version the caller read
        expected: Version,
        /// The version currently stored
        actual: Version,
    },

    /// An update targeted a record that does not exist.
    #[error("Record not found: {entity} {id}")]
    RecordMissing {
        /// Kind of record
        entity: EntityKind,
        /// Record identifier
        id: Uuid,
    },

    /// Waiting for an exclusive section exceeded its bound.
    #[error("Timed out after {waited_ms}ms waiting for {resource}")]
    LockTimeout {
        /// What was being waited for
        resource: String,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// The backend could not be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Database error.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Identity resolver and user registry.
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id. An unknown id is `Ok(None)`, never an error.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn find_user(&self, id: UserId) -> StoreFuture<'_, Option<User>>;

    /// Look up a user by email.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>>;

    /// All registered users.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn list_users(&self) -> StoreFuture<'_, Vec<User>>;

    /// Persist a new user.
    ///
    /// # Errors
    ///
    /// - `UniqueViolation { constraint: UserEmail }`: the email is taken
    /// - `UniqueViolation { constraint: Username }`: the username is taken
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn insert_user(&self, user: User) -> StoreFuture<'_, User>;
}

/// Event records.
pub trait EventRepository: Send + Sync {
    /// Look up an event by id.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn find_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// All events.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn list_events(&self) -> StoreFuture<'_, Vec<Event>>;

    /// Events currently in `status`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn list_events_by_status(&self, status: EventStatus) -> StoreFuture<'_, Vec<Event>>;

    /// Events owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn list_events_by_owner(&self, owner_id: UserId) -> StoreFuture<'_, Vec<Event>>;

    /// Events starting strictly after `instant`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn list_events_starting_after(&self, instant: DateTime<Utc>) -> StoreFuture<'_, Vec<Event>>;

    /// Whether an event already occupies `key`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn listing_exists<'a>(&'a self, key: &'a ListingKey) -> StoreFuture<'a, bool>;

    /// Persist a new event.
    ///
    /// # Errors
    ///
    /// - `UniqueViolation { constraint: EventListing }`: the listing is taken
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event>;

    /// Replace a stored event, provided it is still at `expected`.
    ///
    /// Returns the stored record with its version advanced.
    ///
    /// # Errors
    ///
    /// - `RecordMissing`: no such event
    /// - `ConcurrencyConflict`: the stored version differs from `expected`
    /// - `UniqueViolation { constraint: EventListing }`: the new listing collides
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn update_event(&self, event: Event, expected: Version) -> StoreFuture<'_, Event>;
}

/// Booking records.
pub trait BookingRepository: Send + Sync {
    /// Look up a booking by id.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn find_booking(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Every booking (any status) held by `user_id`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn list_bookings_by_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Booking>>;

    /// Every booking (any status) for `event_id`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn list_bookings_by_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Booking>>;

    /// Non-cancelled bookings for `event_id`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn list_active_bookings_by_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Booking>>;

    /// The non-cancelled booking `user_id` holds for `event_id`, if any.
    ///
    /// # Errors
    ///
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn find_active_booking(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> StoreFuture<'_, Option<Booking>>;

    /// Persist a new booking.
    ///
    /// # Errors
    ///
    /// - `UniqueViolation { constraint: ActiveBooking }`: the user already holds an
    ///   active booking for the event
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn insert_booking(&self, booking: Booking) -> StoreFuture<'_, Booking>;

    /// Replace a stored booking, provided it is still at `expected`.
    ///
    /// Returns the stored record with its version advanced.
    ///
    /// # Errors
    ///
    /// - `RecordMissing`: no such booking
    /// - `ConcurrencyConflict`: the stored version differs from `expected`
    /// - `UniqueViolation { constraint: ActiveBooking }`: re-activating would duplicate
    /// - `Unavailable` / `DatabaseError`: the backend failed
    fn update_booking(&self, booking: Booking, expected: Version) -> StoreFuture<'_, Booking>;
}
