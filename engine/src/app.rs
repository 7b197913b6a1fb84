//! Engine facade - wires the services together over one environment.

use crate::admission::BookingAdmission;
use crate::bookings::BookingLifecycle;
use crate::capacity::CapacityAccountant;
use crate::config::EngineConfig;
use crate::environment::BookingEnvironment;
use crate::events::EventLifecycle;
use crate::locks::EventLocks;
use crate::users::UserRegistry;
use booking_core::{
    Booking, BookingId, CapacitySnapshot, Event, EventDetails, EventId, EventStatus,
    EventUpdate, NewUser, Result, User, UserId,
};
use std::sync::Arc;

/// The booking admission and lifecycle engine.
///
/// Coordinates:
/// - User registry
/// - Event lifecycle manager
/// - Capacity accountant
/// - Booking admission engine
/// - Booking lifecycle manager
///
/// All services share one [`EventLocks`] registry, so admission and event
/// status changes for the same event are serialized while different events
/// proceed in parallel. Cloning is cheap and clones share that registry.
#[derive(Clone, Debug)]
pub struct BookingEngine {
    users: UserRegistry,
    events: EventLifecycle,
    capacity: CapacityAccountant,
    admission: BookingAdmission,
    bookings: BookingLifecycle,
    locks: Arc<EventLocks>,
    config: EngineConfig,
}

impl BookingEngine {
    /// Wire every service over `env` using `config`.
    #[must_use]
    pub fn new(env: BookingEnvironment, config: EngineConfig) -> Self {
        tracing::info!(
            lock_timeout_ms = config.admission.lock_timeout_ms,
            update_policy = %config.lifecycle.update_policy,
            "Initializing booking engine"
        );

        let locks = Arc::new(EventLocks::new(
            config.admission.lock_timeout(),
            config.admission.lock_registry_soft_limit,
        ));

        Self {
            users: UserRegistry::new(env.clone()),
            events: EventLifecycle::new(
                env.clone(),
                locks.clone(),
                config.lifecycle.update_policy,
            ),
            capacity: CapacityAccountant::new(env.clone()),
            admission: BookingAdmission::new(env.clone(), locks.clone()),
            bookings: BookingLifecycle::new(env, config.lifecycle.write_retries),
            locks,
            config,
        }
    }

    /// User registry
    #[must_use]
    pub const fn users(&self) -> &UserRegistry {
        &self.users
    }

    /// Event lifecycle manager
    #[must_use]
    pub const fn events(&self) -> &EventLifecycle {
        &self.events
    }

    /// Capacity accountant
    #[must_use]
    pub const fn capacity(&self) -> &CapacityAccountant {
        &self.capacity
    }

    /// Booking admission engine
    #[must_use]
    pub const fn admission(&self) -> &BookingAdmission {
        &self.admission
    }

    /// Booking lifecycle manager
    #[must_use]
    pub const fn bookings(&self) -> &BookingLifecycle {
        &self.bookings
    }

    /// Per-event lock registry shared by admission and event transitions
    #[must_use]
    pub fn locks(&self) -> Arc<EventLocks> {
        self.locks.clone()
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// See [`UserRegistry::register_user`].
    ///
    /// # Errors
    ///
    /// Propagates the registry's errors.
    pub async fn register_user(&self, request: NewUser) -> Result<User> {
        self.users.register_user(request).await
    }

    /// See [`EventLifecycle::create_event`].
    ///
    /// # Errors
    ///
    /// Propagates the lifecycle manager's errors.
    pub async fn create_event(&self, owner_id: UserId, details: EventDetails) -> Result<Event> {
        self.events.create_event(owner_id, details).await
    }

    /// See [`EventLifecycle::update_event`].
    ///
    /// # Errors
    ///
    /// Propagates the lifecycle manager's errors.
    pub async fn update_event(&self, event_id: EventId, update: EventUpdate) -> Result<Event> {
        self.events.update_event(event_id, update).await
    }

    /// See [`EventLifecycle::publish_event`].
    ///
    /// # Errors
    ///
    /// Propagates the lifecycle manager's errors.
    pub async fn publish_event(&self, event_id: EventId, requester_id: UserId) -> Result<Event> {
        self.events.publish_event(event_id, requester_id).await
    }

    /// See [`EventLifecycle::cancel_event`].
    ///
    /// # Errors
    ///
    /// Propagates the lifecycle manager's errors.
    pub async fn cancel_event(&self, event_id: EventId) -> Result<()> {
        self.events.cancel_event(event_id).await
    }

    /// See [`BookingAdmission::create_booking`].
    ///
    /// # Errors
    ///
    /// Propagates the admission engine's errors.
    pub async fn create_booking(
        &self,
        user_id: UserId,
        event_id: EventId,
        ticket_count: u32,
    ) -> Result<Booking> {
        self.admission
            .create_booking(user_id, event_id, ticket_count)
            .await
    }

    /// See [`BookingLifecycle::cancel_booking`].
    ///
    /// # Errors
    ///
    /// Propagates the lifecycle manager's errors.
    pub async fn cancel_booking(&self, booking_id: BookingId) -> Result<()> {
        self.bookings.cancel_booking(booking_id).await
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// `ActorNotFound` for an unknown user, `Storage` if the store fails.
    pub async fn find_user(&self, user_id: UserId) -> Result<User> {
        self.users.find_user(user_id).await
    }

    /// Look up a user by email.
    ///
    /// # Errors
    ///
    /// `Storage` if the store fails.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users.find_user_by_email(email).await
    }

    /// All registered users.
    ///
    /// # Errors
    ///
    /// `Storage` if the store fails.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users.list_users().await
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// `EventNotFound` for an unknown event, `Storage` if the store fails.
    pub async fn find_event(&self, event_id: EventId) -> Result<Event> {
        self.events.find_event(event_id).await
    }

    /// All events.
    ///
    /// # Errors
    ///
    /// `Storage` if the store fails.
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        self.events.list_events().await
    }

    /// Events in `status`.
    ///
    /// # Errors
    ///
    /// `Storage` if the store fails.
    pub async fn list_events_by_status(&self, status: EventStatus) -> Result<Vec<Event>> {
        self.events.list_events_by_status(status).await
    }

    /// Events owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// `Storage` if the store fails.
    pub async fn list_events_by_owner(&self, owner_id: UserId) -> Result<Vec<Event>> {
        self.events.list_events_by_owner(owner_id).await
    }

    /// Published events that have not started, soonest first.
    ///
    /// # Errors
    ///
    /// `Storage` if the store fails.
    pub async fn upcoming_events(&self) -> Result<Vec<Event>> {
        self.events.upcoming_events().await
    }

    /// Tickets still available for the event.
    ///
    /// # Errors
    ///
    /// `EventNotFound` for an unknown event, `Storage` if the store fails.
    pub async fn remaining_capacity(&self, event_id: EventId) -> Result<u32> {
        self.capacity.remaining_capacity(event_id).await
    }

    /// Capacity, booked and remaining tickets for the event.
    ///
    /// # Errors
    ///
    /// `EventNotFound` for an unknown event, `Storage` if the store fails.
    pub async fn capacity_snapshot(&self, event_id: EventId) -> Result<CapacitySnapshot> {
        self.capacity.snapshot(event_id).await
    }

    /// Look up a booking.
    ///
    /// # Errors
    ///
    /// `BookingNotFound` for an unknown booking, `Storage` if the store fails.
    pub async fn find_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.bookings.find_booking(booking_id).await
    }

    /// Every booking held by the user.
    ///
    /// # Errors
    ///
    /// `ActorNotFound` for an unknown user, `Storage` if the store fails.
    pub async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        self.bookings.bookings_for_user(user_id).await
    }

    /// Every booking for the event.
    ///
    /// # Errors
    ///
    /// `EventNotFound` for an unknown event, `Storage` if the store fails.
    pub async fn bookings_for_event(&self, event_id: EventId) -> Result<Vec<Booking>> {
        self.bookings.bookings_for_event(event_id).await
    }
}
