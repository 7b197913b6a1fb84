//! Injected collaborators shared by every engine service.

use booking_core::environment::Clock;
use booking_core::store::{BookingRepository, EventRepository, UserDirectory};
use std::sync::Arc;

/// Dependencies the engine services run against.
///
/// Cloning is cheap: every field is an `Arc`.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Source of "now" for start-time checks and timestamps
    pub clock: Arc<dyn Clock>,
    /// Identity resolver and user registry
    pub users: Arc<dyn UserDirectory>,
    /// Event records
    pub events: Arc<dyn EventRepository>,
    /// Booking records
    pub bookings: Arc<dyn BookingRepository>,
}

impl BookingEnvironment {
    /// Creates an environment from separate collaborators
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        users: Arc<dyn UserDirectory>,
        events: Arc<dyn EventRepository>,
        bookings: Arc<dyn BookingRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            events,
            bookings,
        }
    }

    /// Creates an environment where one store backs all three repositories
    #[must_use]
    pub fn from_store<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: UserDirectory + EventRepository + BookingRepository + 'static,
    {
        Self {
            clock,
            users: store.clone(),
            events: store.clone(),
            bookings: store,
        }
    }
}

impl std::fmt::Debug for BookingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
