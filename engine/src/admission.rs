//! Booking admission.
//!
//! A booking request is checked in a fixed order so rejections are deterministic:
//!
//! 1. the user exists
//! 2. the event exists
//! 3. the user does not own the event
//! 4. the user holds no active booking for the event
//! 5. the event is published
//! 6. the event has not started
//! 7. enough tickets remain
//!
//! Steps 2 to 7 and the booking insert run while holding the event's guard, so two
//! requests for the same event cannot both observe the same free tickets. The store's
//! one-active-booking constraint backs up step 4.

use crate::capacity::CapacityAccountant;
use crate::environment::BookingEnvironment;
use crate::locks::EventLocks;
use crate::metrics;
use booking_core::{
    Booking, BookingError, BookingId, Constraint, EventId, EventStatus, Result, StoreError,
    UserId,
};
use std::sync::Arc;

/// Decides whether a booking request is admitted and commits it.
#[derive(Clone, Debug)]
pub struct BookingAdmission {
    env: BookingEnvironment,
    locks: Arc<EventLocks>,
    capacity: CapacityAccountant,
}

impl BookingAdmission {
    /// Creates the admission engine
    #[must_use]
    pub fn new(env: BookingEnvironment, locks: Arc<EventLocks>) -> Self {
        Self {
            capacity: CapacityAccountant::new(env.clone()),
            env,
            locks,
        }
    }

    /// Book `ticket_count` tickets of `event_id` for `user_id`.
    ///
    /// On success the booking is stored as Confirmed, stamped with the current time.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidInput`] if `ticket_count` is zero
    /// - [`BookingError::ActorNotFound`] if the user is unknown
    /// - [`BookingError::EventNotFound`] if the event is unknown
    /// - [`BookingError::SelfBookingNotAllowed`] if the user owns the event
    /// - [`BookingError::AlreadyBooked`] if the user already holds an active booking
    /// - [`BookingError::EventNotPublished`] if the event is Draft or Cancelled
    /// - [`BookingError::EventAlreadyStarted`] if the event start is not in the future
    /// - [`BookingError::InsufficientCapacity`] if fewer than `ticket_count` remain
    /// - [`BookingError::Storage`] if the store fails or the lock times out
    pub async fn create_booking(
        &self,
        user_id: UserId,
        event_id: EventId,
        ticket_count: u32,
    ) -> Result<Booking> {
        tracing::debug!(
            user_id = %user_id,
            event_id = %event_id,
            ticket_count,
            "Booking requested"
        );

        match self.admit(user_id, event_id, ticket_count).await {
            Ok(booking) => {
                metrics::record_admitted(booking.ticket_count);
                tracing::info!(
                    booking_id = %booking.id,
                    user_id = %user_id,
                    event_id = %event_id,
                    ticket_count,
                    "Booking confirmed"
                );
                Ok(booking)
            }
            Err(error) => {
                metrics::record_rejected(&error);
                tracing::debug!(
                    user_id = %user_id,
                    event_id = %event_id,
                    %error,
                    "Booking rejected"
                );
                Err(error)
            }
        }
    }

    async fn admit(&self, user_id: UserId, event_id: EventId, ticket_count: u32) -> Result<Booking> {
        if ticket_count == 0 {
            return Err(BookingError::invalid_input("ticket_count", "must be at least 1"));
        }

        if self.env.users.find_user(user_id).await?.is_none() {
            return Err(BookingError::ActorNotFound(user_id));
        }

        let guard = self.locks.acquire(event_id).await?;

        let event = self
            .env
            .events
            .find_event(event_id)
            .await?
            .ok_or(BookingError::EventNotFound(event_id))?;

        if event.is_owned_by(user_id) {
            tracing::warn!(user_id = %user_id, event_id = %event_id, "Organizer tried to book own event");
            return Err(BookingError::SelfBookingNotAllowed { event_id, user_id });
        }

        if self
            .env
            .bookings
            .find_active_booking(user_id, event_id)
            .await?
            .is_some()
        {
            return Err(BookingError::AlreadyBooked { user_id, event_id });
        }

        if event.status != EventStatus::Published {
            return Err(BookingError::EventNotPublished {
                event_id,
                status: event.status,
            });
        }

        let now = self.env.clock.now();
        if event.has_started(now) {
            return Err(BookingError::EventAlreadyStarted {
                event_id,
                starts_at: event.details.starts_at,
            });
        }

        let snapshot = self.capacity.snapshot_of(&event).await?;
        if ticket_count > snapshot.remaining {
            return Err(BookingError::InsufficientCapacity {
                event_id,
                requested: ticket_count,
                remaining: snapshot.remaining,
            });
        }

        let booking = Booking::confirmed(BookingId::new(), event_id, user_id, ticket_count, now);
        let stored = self
            .env
            .bookings
            .insert_booking(booking)
            .await
            .map_err(|error| match error {
                StoreError::UniqueViolation {
                    constraint: Constraint::ActiveBooking,
                } => BookingError::AlreadyBooked { user_id, event_id },
                other => BookingError::Storage(other),
            })?;

        drop(guard);
        Ok(stored)
    }
}
