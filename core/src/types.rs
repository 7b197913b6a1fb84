//! Domain types for the event booking engine.
//!
//! This module contains the identifiers, value objects and entities shared by every
//! component of the engine: users, events and bookings, together with their status
//! state machines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Versioning
// ============================================================================

/// Record version used for optimistic concurrency on single-record updates.
///
/// A freshly inserted record is at [`Version::initial`]; every successful update
/// moves it to [`Version::next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Creates a version from a raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The version of a record that has never been updated
    #[must_use]
    pub const fn initial() -> Self {
        Self(1)
    }

    /// The version following this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the raw version value
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Total number of tickets an event can admit
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Remaining admission slots once `booked` tickets are subtracted
    #[must_use]
    pub fn remaining_after(&self, booked: u64) -> u32 {
        u32::try_from(u64::from(self.0).saturating_sub(booked)).unwrap_or(0)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Users
// ============================================================================

/// Role a user acts under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Books tickets for events
    Attendee,
    /// Hosts events and is the only role allowed to create or publish them
    Organizer,
    /// Privileged operator, never self-registered
    Administrator,
}

impl UserRole {
    /// Stable name of the role
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attendee => "Attendee",
            Self::Organizer => "Organizer",
            Self::Administrator => "Administrator",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,
    /// Display name
    pub username: String,
    /// Contact email, unique across users
    pub email: String,
    /// Role the user acts under
    pub role: UserRole,
    /// When the user was registered
    pub registered_at: DateTime<Utc>,
}

impl User {
    /// Creates a new `User`
    #[must_use]
    pub const fn new(
        id: UserId,
        username: String,
        email: String,
        role: UserRole,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            email,
            role,
            registered_at,
        }
    }

    /// Whether the user currently holds the given role
    #[must_use]
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }
}

/// Registration request for a new user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name (3-20 characters)
    pub username: String,
    /// Contact email
    pub email: String,
    /// Requested role
    pub role: UserRole,
}

impl NewUser {
    /// Creates a new registration request
    #[must_use]
    pub fn new(username: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            role,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Kind of event being listed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Live music
    Concert,
    /// Talks and panels
    Conference,
    /// Hands-on sessions
    Workshop,
    /// Sporting fixtures
    Sports,
    /// Stage performances
    Theatre,
    /// Anything else
    Other,
}

/// Event lifecycle status
///
/// ```text
/// Draft ──publish──▶ Published
///   │                    │
///   └──────cancel────────┴──▶ Cancelled (terminal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    /// Being prepared by its organizer, not bookable
    Draft,
    /// Visible and bookable
    Published,
    /// Called off (terminal)
    Cancelled,
}

impl EventStatus {
    /// Stable name of the status
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether no transition leaves this status
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Published) | (Self::Draft | Self::Published, Self::Cancelled)
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a listing: at most one event may exist per owner, start and location.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingKey {
    /// Organizer owning the listing
    pub owner_id: UserId,
    /// Start of the event
    pub starts_at: DateTime<Utc>,
    /// Venue or address
    pub location: String,
}

/// Descriptive fields of an event, supplied on creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Event title (3-100 characters)
    pub title: String,
    /// Free-form description (at most 2000 characters)
    pub description: String,
    /// Venue or address
    pub location: String,
    /// When the event starts
    pub starts_at: DateTime<Utc>,
    /// When the event ends (strictly after `starts_at`)
    pub ends_at: DateTime<Utc>,
    /// Total admittable tickets
    pub capacity: Capacity,
    /// Price per ticket
    pub ticket_price: Money,
    /// Kind of event
    pub category: EventCategory,
}

/// Partial update of an event; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New start
    pub starts_at: Option<DateTime<Utc>>,
    /// New end
    pub ends_at: Option<DateTime<Utc>>,
    /// New capacity
    pub capacity: Option<Capacity>,
    /// New ticket price
    pub ticket_price: Option<Money>,
    /// New category
    pub category: Option<EventCategory>,
}

impl EventUpdate {
    /// Whether the update supplies no field at all
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.starts_at.is_none()
            && self.ends_at.is_none()
            && self.capacity.is_none()
            && self.ticket_price.is_none()
            && self.category.is_none()
    }

    /// Merges the supplied fields over `current`
    #[must_use]
    pub fn merge_into(self, current: &EventDetails) -> EventDetails {
        EventDetails {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            location: self.location.unwrap_or_else(|| current.location.clone()),
            starts_at: self.starts_at.unwrap_or(current.starts_at),
            ends_at: self.ends_at.unwrap_or(current.ends_at),
            capacity: self.capacity.unwrap_or(current.capacity),
            ticket_price: self.ticket_price.unwrap_or(current.ticket_price),
            category: self.category.unwrap_or(current.category),
        }
    }
}

/// Event entity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Organizer who owns the event
    pub owner_id: UserId,
    /// Descriptive fields
    pub details: EventDetails,
    /// Current lifecycle status
    pub status: EventStatus,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// When the event was last modified
    pub updated_at: DateTime<Utc>,
    /// Record version for optimistic updates
    pub version: Version,
}

impl Event {
    /// Creates a new `Event` in `Draft` status
    #[must_use]
    pub const fn new(
        id: EventId,
        owner_id: UserId,
        details: EventDetails,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            details,
            status: EventStatus::Draft,
            created_at,
            updated_at: created_at,
            version: Version::initial(),
        }
    }

    /// Listing identity of this event
    #[must_use]
    pub fn listing_key(&self) -> ListingKey {
        ListingKey {
            owner_id: self.owner_id,
            starts_at: self.details.starts_at,
            location: self.details.location.clone(),
        }
    }

    /// Total admittable tickets
    #[must_use]
    pub const fn capacity(&self) -> Capacity {
        self.details.capacity
    }

    /// Whether `user_id` owns this event
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    /// Whether the event has started at `now` (start ≤ now)
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.details.starts_at <= now
    }

    /// Copy of this event moved to `status`
    #[must_use]
    pub fn with_status(&self, status: EventStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: at,
            ..self.clone()
        }
    }

    /// Copy of this event carrying `details`
    #[must_use]
    pub fn with_details(&self, details: EventDetails, at: DateTime<Utc>) -> Self {
        Self {
            details,
            updated_at: at,
            ..self.clone()
        }
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Awaiting asynchronous confirmation (not produced by the synchronous path)
    Pending,
    /// Admitted and holding capacity
    Confirmed,
    /// Released (terminal)
    Cancelled,
}

impl BookingStatus {
    /// Stable name of the status
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether a booking in this status still holds capacity
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's claim on a number of tickets for one event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// Event the tickets are for
    pub event_id: EventId,
    /// User holding the tickets
    pub user_id: UserId,
    /// Number of tickets (at least 1)
    pub ticket_count: u32,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// When the booking was committed
    pub booked_at: DateTime<Utc>,
    /// When the booking was cancelled, if it was
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Record version for optimistic updates
    pub version: Version,
}

impl Booking {
    /// Creates a booking admitted at `booked_at`
    #[must_use]
    pub const fn confirmed(
        id: BookingId,
        event_id: EventId,
        user_id: UserId,
        ticket_count: u32,
        booked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            event_id,
            user_id,
            ticket_count,
            status: BookingStatus::Confirmed,
            booked_at,
            cancelled_at: None,
            version: Version::initial(),
        }
    }

    /// Whether the booking still holds capacity
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Copy of this booking moved to `Cancelled`
    #[must_use]
    pub fn cancelled(&self, at: DateTime<Utc>) -> Self {
        Self {
            status: BookingStatus::Cancelled,
            cancelled_at: Some(at),
            ..self.clone()
        }
    }
}

/// Capacity figures for one event at a point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// Event the figures belong to
    pub event_id: EventId,
    /// Total admittable tickets
    pub capacity: Capacity,
    /// Tickets held by non-cancelled bookings
    pub booked: u64,
    /// Tickets still available
    pub remaining: u32,
}
