//! # Booking Testing
//!
//! Testing utilities and helpers for the event booking engine.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - [`InMemoryStore`]: a thread-safe implementation of every storage trait with the
//!   same uniqueness and optimistic-version guarantees a database would give
//! - Fixture builders for users and event details
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use booking_core::store::UserDirectory;
//! use booking_core::{User, UserId, UserRole};
//! use booking_testing::{test_clock, InMemoryStore};
//! use booking_core::environment::Clock;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! let user = User::new(
//!     UserId::new(),
//!     "alice".to_string(),
//!     "alice@example.com".to_string(),
//!     UserRole::Attendee,
//!     test_clock().now(),
//! );
//! store.insert_user(user.clone()).await?;
//! assert_eq!(store.find_user(user.id).await?, Some(user));
//! # Ok(())
//! # }
//! ```

use booking_core::environment::Clock;
use chrono::{DateTime, Utc};

mod memory;

pub use memory::InMemoryStore;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use booking_testing::mocks::FixedClock;
    /// use booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep one handle and give another to
    /// the engine, then advance past an event's start.
    ///
    /// ```
    /// use booking_testing::mocks::ManualClock;
    /// use booking_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = ManualClock::new(Utc::now());
    /// let start = clock.now();
    /// clock.advance(Duration::hours(1));
    /// assert_eq!(clock.now() - start, Duration::hours(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Jump to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }

        /// Move forward by `by`
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// The instant every test clock starts from (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

/// Fixture builders for users and events.
pub mod helpers {
    use booking_core::{Capacity, EventCategory, EventDetails, Money, NewUser, UserRole};
    use chrono::{DateTime, Duration, Utc};

    /// Registration request for an organizer named `name`
    #[must_use]
    pub fn organizer(name: &str) -> NewUser {
        NewUser::new(name, format!("{name}@example.com"), UserRole::Organizer)
    }

    /// Registration request for an attendee named `name`
    #[must_use]
    pub fn attendee(name: &str) -> NewUser {
        NewUser::new(name, format!("{name}@example.com"), UserRole::Attendee)
    }

    /// Event details starting at `starts_at` with room for `capacity` tickets
    #[must_use]
    pub fn event_details(starts_at: DateTime<Utc>, capacity: u32) -> EventDetails {
        EventDetailsBuilder::new(starts_at).capacity(capacity).build()
    }

    /// Builder for [`EventDetails`] with sensible defaults.
    ///
    /// Defaults: a two hour free conference called "Rust Meetup" in "Main Hall" for
    /// 10 people.
    #[derive(Clone, Debug)]
    pub struct EventDetailsBuilder {
        details: EventDetails,
    }

    impl EventDetailsBuilder {
        /// Start building an event that begins at `starts_at`
        #[must_use]
        pub fn new(starts_at: DateTime<Utc>) -> Self {
            Self {
                details: EventDetails {
                    title: "Rust Meetup".to_string(),
                    description: "Talks and pizza".to_string(),
                    location: "Main Hall".to_string(),
                    starts_at,
                    ends_at: starts_at + Duration::hours(2),
                    capacity: Capacity::new(10),
                    ticket_price: Money::from_cents(0),
                    category: EventCategory::Conference,
                },
            }
        }

        /// Set the title
        #[must_use]
        pub fn title(mut self, title: &str) -> Self {
            self.details.title = title.to_string();
            self
        }

        /// Set the description
        #[must_use]
        pub fn description(mut self, description: &str) -> Self {
            self.details.description = description.to_string();
            self
        }

        /// Set the location
        #[must_use]
        pub fn location(mut self, location: &str) -> Self {
            self.details.location = location.to_string();
            self
        }

        /// Set the end time
        #[must_use]
        pub const fn ends_at(mut self, ends_at: DateTime<Utc>) -> Self {
            self.details.ends_at = ends_at;
            self
        }

        /// Set the capacity
        #[must_use]
        pub const fn capacity(mut self, capacity: u32) -> Self {
            self.details.capacity = Capacity::new(capacity);
            self
        }

        /// Set the ticket price in cents
        #[must_use]
        pub const fn ticket_price_cents(mut self, cents: u64) -> Self {
            self.details.ticket_price = Money::from_cents(cents);
            self
        }

        /// Set the category
        #[must_use]
        pub const fn category(mut self, category: EventCategory) -> Self {
            self.details.category = category;
            self
        }

        /// Finish building
        #[must_use]
        pub fn build(self) -> EventDetails {
            self.details
        }
    }

    /// Install a test-friendly tracing subscriber (idempotent).
    ///
    /// Honours `RUST_LOG`, defaulting to `warn`.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use booking_core::EventCategory;
    use proptest::prelude::*;

    /// One step of a randomly generated booking workload
    #[derive(Clone, Debug)]
    pub enum BookingOp {
        /// User at index `user` requests `tickets`
        Book {
            /// Index into the test's attendee list
            user: usize,
            /// Tickets requested
            tickets: u32,
        },
        /// Cancel the `nth` booking that succeeded so far (modulo count)
        Cancel {
            /// Index into the successful bookings
            nth: usize,
        },
    }

    /// Event capacity between 1 and 40
    pub fn capacity() -> impl Strategy<Value = u32> {
        1u32..=40
    }

    /// Ticket request between 1 and 8
    pub fn ticket_count() -> impl Strategy<Value = u32> {
        1u32..=8
    }

    /// Any event category
    pub fn event_category() -> impl Strategy<Value = EventCategory> {
        prop_oneof![
            Just(EventCategory::Concert),
            Just(EventCategory::Conference),
            Just(EventCategory::Workshop),
            Just(EventCategory::Sports),
            Just(EventCategory::Theatre),
            Just(EventCategory::Other),
        ]
    }

    /// Sequence of up to `max_len` operations over `users` attendees, roughly
    /// three bookings per cancellation.
    pub fn booking_ops(users: usize, max_len: usize) -> impl Strategy<Value = Vec<BookingOp>> {
        let op = prop_oneof![
            3 => (0..users, ticket_count())
                .prop_map(|(user, tickets)| BookingOp::Book { user, tickets }),
            1 => any::<usize>().prop_map(|nth| BookingOp::Cancel { nth }),
        ];
        proptest::collection::vec(op, 1..=max_len)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};
