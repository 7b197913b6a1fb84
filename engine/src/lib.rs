//! # Booking Engine
//!
//! Admission and lifecycle engine for event bookings: a finite number of tickets per
//! event, claimed concurrently by independent users, without ever overselling.
//!
//! # Architecture
//!
//! ```text
//!   register_user ──► UserRegistry
//!
//!   create/update/publish/cancel_event ──► EventLifecycle ──┐
//!                                                          │  per-event guard
//!   create_booking ──► BookingAdmission ──► CapacityAccountant
//!                              │                           │
//!                              └───────── EventLocks ◄─────┘
//!
//!   cancel_booking ──► BookingLifecycle (optimistic single-row update)
//!
//!                  all of the above ──► BookingEnvironment
//!                                       (Clock, UserDirectory,
//!                                        EventRepository, BookingRepository)
//! ```
//!
//! # Key Features
//!
//! ## Overbooking prevention
//!
//! Remaining capacity is derived from live bookings:
//!
//! ```text
//! remaining = capacity - Σ ticket_count of non-cancelled bookings
//! ```
//!
//! The derivation is only trustworthy at decision time because admission holds the
//! event's guard from the event read through the booking insert. Concurrent requests
//! for the same event queue on that guard (bounded by a timeout); requests for other
//! events never do.
//!
//! ## Deterministic rejections
//!
//! Every failure is a typed [`BookingError`](booking_core::BookingError). Admission
//! checks run in a fixed order, so the same state always yields the same error.
//!
//! # Example
//!
//! ```no_run
//! use booking_engine::{BookingEngine, BookingEnvironment, EngineConfig};
//! use booking_core::environment::SystemClock;
//! use booking_testing::helpers::{attendee, event_details, organizer};
//! use booking_testing::InMemoryStore;
//! use chrono::{Duration, Utc};
//! use std::sync::Arc;
//!
//! # async fn example() -> booking_core::Result<()> {
//! let env = BookingEnvironment::from_store(Arc::new(InMemoryStore::new()), Arc::new(SystemClock));
//! let engine = BookingEngine::new(env, EngineConfig::default());
//!
//! let olga = engine.register_user(organizer("olga")).await?;
//! let alice = engine.register_user(attendee("alice")).await?;
//!
//! let event = engine
//!     .create_event(olga.id, event_details(Utc::now() + Duration::days(7), 10))
//!     .await?;
//! engine.publish_event(event.id, olga.id).await?;
//!
//! let booking = engine.create_booking(alice.id, event.id, 2).await?;
//! assert_eq!(engine.remaining_capacity(event.id).await?, 8);
//!
//! engine.cancel_booking(booking.id).await?;
//! assert_eq!(engine.remaining_capacity(event.id).await?, 10);
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod app;
pub mod bookings;
pub mod capacity;
pub mod config;
pub mod environment;
pub mod events;
pub mod locks;
pub mod metrics;
pub mod users;

pub use admission::BookingAdmission;
pub use app::BookingEngine;
pub use bookings::BookingLifecycle;
pub use capacity::CapacityAccountant;
pub use config::{AdmissionConfig, ConfigError, EngineConfig, LifecycleConfig, UpdatePolicy};
pub use environment::BookingEnvironment;
pub use events::EventLifecycle;
pub use locks::{EventGuard, EventLocks};
pub use users::UserRegistry;
