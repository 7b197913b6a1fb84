//! # Booking Core
//!
//! Domain types, typed errors and storage contracts for the event booking engine.
//!
//! This crate holds everything the engine and its collaborators share:
//!
//! - **Types**: users, events and bookings with their status state machines
//! - **Errors**: [`BookingError`] and its [`ErrorKind`] taxonomy
//! - **Store**: the object-safe [`store::UserDirectory`], [`store::EventRepository`]
//!   and [`store::BookingRepository`] traits the engine is written against
//! - **Environment**: injected dependencies such as the [`environment::Clock`]
//!
//! ## Capacity model
//!
//! Capacity consumption is derived, never stored:
//!
//! ```text
//! remaining = event.capacity − Σ ticket_count over non-cancelled bookings of the event
//! ```
//!
//! Cancelling a booking therefore frees its tickets without any separate release step.

pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{BookingError, EntityKind, ErrorKind, Result};
pub use store::{BookingRepository, Constraint, EventRepository, StoreError, UserDirectory};
pub use types::*;

/// Environment module - Dependency injection traits
///
/// All time-dependent decisions (has the event started, booking timestamps) read the
/// clock through this trait so tests can pin or advance time.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use booking_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
