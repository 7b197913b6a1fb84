//! Typed failures returned by every engine operation.
//!
//! Each business rejection is a variant of [`BookingError`]. Callers that only need the
//! coarse category (for example to pick a transport status code) use [`BookingError::kind`].
//! Storage failures that are not business conflicts travel as [`BookingError::Storage`]
//! and are never folded into a domain variant.

use crate::store::StoreError;
use crate::types::{BookingId, EventId, EventStatus, UserId, UserRole};
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, BookingError>;

/// Which kind of record an error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A [`crate::types::User`]
    User,
    /// A [`crate::types::Event`]
    Event,
    /// A [`crate::types::Booking`]
    Booking,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Event => "event",
            Self::Booking => "booking",
        })
    }
}

/// Coarse classification of a [`BookingError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced user, event or booking does not exist
    NotFound,
    /// The request collides with an existing record
    Conflict,
    /// A status precondition was violated
    InvalidTransition,
    /// Authorization-shaped business rule (role or ownership)
    NotPermitted,
    /// Booking admission refused the request
    AdmissionRejected,
    /// A field value is malformed
    InvalidInput,
    /// The storage collaborator failed
    StorageFailure,
}

/// Errors returned by the booking engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// No user with this id exists
    #[error("User {0} not found")]
    ActorNotFound(UserId),

    /// No event with this id exists
    #[error("Event {0} not found")]
    EventNotFound(EventId),

    /// No booking with this id exists
    #[error("Booking {0} not found")]
    BookingNotFound(BookingId),

    /// The owner already lists an event at this start time and location
    #[error("Owner {owner_id} already lists an event at {starts_at} in '{location}'")]
    DuplicateEvent {
        /// Owner of both listings
        owner_id: UserId,
        /// Shared start time
        starts_at: DateTime<Utc>,
        /// Shared location
        location: String,
    },

    /// The user already holds a non-cancelled booking for the event
    #[error("User {user_id} already holds an active booking for event {event_id}")]
    AlreadyBooked {
        /// User attempting to book
        user_id: UserId,
        /// Event already booked
        event_id: EventId,
    },

    /// Another user is registered with this email
    #[error("A user with email '{0}' is already registered")]
    UserAlreadyExists(String),

    /// Another user is registered under this username
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    /// The record's status does not allow the requested action
    #[error("Cannot {action} {entity} {id} while it is {status}")]
    InvalidTransition {
        /// Kind of record
        entity: EntityKind,
        /// Record identifier
        id: Uuid,
        /// Status the record is in
        status: &'static str,
        /// Action that was refused
        action: &'static str,
    },

    /// The role involved may not perform the action
    #[error("Role {role} is not permitted to {action}")]
    RoleNotPermitted {
        /// Role that was checked
        role: UserRole,
        /// Action that was refused
        action: &'static str,
    },

    /// The requester does not own the event
    #[error("User {user_id} does not own event {event_id}")]
    NotOwner {
        /// Event being acted on
        event_id: EventId,
        /// Requesting user
        user_id: UserId,
    },

    /// The event is not open for booking
    #[error("Event {event_id} is {status} and cannot be booked")]
    EventNotPublished {
        /// Event being booked
        event_id: EventId,
        /// Its current status
        status: EventStatus,
    },

    /// The event has already started
    #[error("Event {event_id} started at {starts_at} and can no longer be booked")]
    EventAlreadyStarted {
        /// Event being booked
        event_id: EventId,
        /// When it started
        starts_at: DateTime<Utc>,
    },

    /// Organizers cannot book their own events
    #[error("User {user_id} owns event {event_id} and cannot book it")]
    SelfBookingNotAllowed {
        /// Event being booked
        event_id: EventId,
        /// Its owner
        user_id: UserId,
    },

    /// Not enough tickets remain
    #[error("Insufficient capacity for event {event_id}: requested {requested}, remaining {remaining}")]
    InsufficientCapacity {
        /// Event being booked
        event_id: EventId,
        /// Tickets requested
        requested: u32,
        /// Tickets still available
        remaining: u32,
    },

    /// A field value is malformed
    #[error("Invalid {field}: {reason}")]
    InvalidInput {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The storage collaborator failed
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl BookingError {
    /// Coarse classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ActorNotFound(_) | Self::EventNotFound(_) | Self::BookingNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::DuplicateEvent { .. }
            | Self::AlreadyBooked { .. }
            | Self::UserAlreadyExists(_)
            | Self::UsernameTaken(_) => ErrorKind::Conflict,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::RoleNotPermitted { .. } | Self::NotOwner { .. } => ErrorKind::NotPermitted,
            Self::EventNotPublished { .. }
            | Self::EventAlreadyStarted { .. }
            | Self::SelfBookingNotAllowed { .. }
            | Self::InsufficientCapacity { .. } => ErrorKind::AdmissionRejected,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Shorthand for an [`BookingError::InvalidInput`]
    #[must_use]
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
