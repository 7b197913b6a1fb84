//! Booking lifecycle: cancellation and booking reads.
//!
//! Cancellation does not take the event guard. It is a single-row optimistic update:
//! read the booking, write it back as Cancelled against the version that was read,
//! and re-read on a version conflict. Of two racing cancellations one wins and the
//! other re-reads a Cancelled booking and fails with `InvalidTransition`.

use crate::environment::BookingEnvironment;
use crate::metrics;
use booking_core::{
    Booking, BookingError, BookingId, EntityKind, EventId, Result, StoreError, UserId,
};

/// Owns booking state transitions and booking queries.
#[derive(Clone, Debug)]
pub struct BookingLifecycle {
    env: BookingEnvironment,
    write_retries: u32,
}

impl BookingLifecycle {
    /// Creates the booking lifecycle manager.
    ///
    /// `write_retries` bounds how many version conflicts a cancellation absorbs before
    /// giving up.
    #[must_use]
    pub const fn new(env: BookingEnvironment, write_retries: u32) -> Self {
        Self { env, write_retries }
    }

    /// Cancel a booking, releasing its tickets.
    ///
    /// # Errors
    ///
    /// - [`BookingError::BookingNotFound`] if the booking does not exist
    /// - [`BookingError::InvalidTransition`] if it is already cancelled
    /// - [`BookingError::Storage`] if the store fails or conflicts persist past the
    ///   retry budget
    pub async fn cancel_booking(&self, booking_id: BookingId) -> Result<()> {
        tracing::debug!(booking_id = %booking_id, "Cancelling booking");

        let mut attempt = 0;
        loop {
            let booking = self.find_booking(booking_id).await?;
            if !booking.is_active() {
                return Err(already_cancelled(&booking));
            }

            let expected = booking.version;
            let cancelled = booking.cancelled(self.env.clock.now());
            match self.env.bookings.update_booking(cancelled, expected).await {
                Ok(stored) => {
                    metrics::record_cancellation();
                    tracing::info!(
                        booking_id = %booking_id,
                        event_id = %stored.event_id,
                        released = stored.ticket_count,
                        "Booking cancelled"
                    );
                    return Ok(());
                }
                Err(StoreError::ConcurrencyConflict { .. }) if attempt < self.write_retries => {
                    attempt += 1;
                    tracing::debug!(booking_id = %booking_id, attempt, "Booking changed concurrently, retrying");
                }
                Err(conflict @ StoreError::ConcurrencyConflict { .. }) => {
                    // Out of retries, but a competing cancellation still decides the outcome.
                    let current = self.find_booking(booking_id).await?;
                    if !current.is_active() {
                        return Err(already_cancelled(&current));
                    }
                    return Err(conflict.into());
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Look up a booking.
    ///
    /// # Errors
    ///
    /// - [`BookingError::BookingNotFound`] if the booking does not exist
    /// - [`BookingError::Storage`] if the store fails
    pub async fn find_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.env
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// Every booking (any status) held by `user_id`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::ActorNotFound`] if the user does not exist
    /// - [`BookingError::Storage`] if the store fails
    pub async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        if self.env.users.find_user(user_id).await?.is_none() {
            return Err(BookingError::ActorNotFound(user_id));
        }
        Ok(self.env.bookings.list_bookings_by_user(user_id).await?)
    }

    /// Every booking (any status) for `event_id`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`] if the event does not exist
    /// - [`BookingError::Storage`] if the store fails
    pub async fn bookings_for_event(&self, event_id: EventId) -> Result<Vec<Booking>> {
        if self.env.events.find_event(event_id).await?.is_none() {
            return Err(BookingError::EventNotFound(event_id));
        }
        Ok(self.env.bookings.list_bookings_by_event(event_id).await?)
    }
}

fn already_cancelled(booking: &Booking) -> BookingError {
    BookingError::InvalidTransition {
        entity: EntityKind::Booking,
        id: *booking.id.as_uuid(),
        status: booking.status.as_str(),
        action: "cancel",
    }
}
