//! Capacity accounting.
//!
//! Remaining capacity is never stored. It is recomputed from the event's non-cancelled
//! bookings on every call, so it cannot drift from the booking set. Whether the figure
//! can be trusted at decision time depends on the caller holding the event's guard
//! (see [`crate::locks`]).

use crate::environment::BookingEnvironment;
use booking_core::{BookingError, CapacitySnapshot, Event, EventId, Result};

/// Computes remaining admission slots for events.
#[derive(Clone, Debug)]
pub struct CapacityAccountant {
    env: BookingEnvironment,
}

impl CapacityAccountant {
    /// Creates an accountant reading from `env`
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Tickets still available for `event_id`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`] if the event does not exist
    /// - [`BookingError::Storage`] if the store fails
    pub async fn remaining_capacity(&self, event_id: EventId) -> Result<u32> {
        Ok(self.snapshot(event_id).await?.remaining)
    }

    /// Capacity, booked tickets and remaining tickets for `event_id`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`] if the event does not exist
    /// - [`BookingError::Storage`] if the store fails
    pub async fn snapshot(&self, event_id: EventId) -> Result<CapacitySnapshot> {
        let event = self
            .env
            .events
            .find_event(event_id)
            .await?
            .ok_or(BookingError::EventNotFound(event_id))?;

        self.snapshot_of(&event).await
    }

    /// Tickets held by non-cancelled bookings of `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    pub async fn booked_tickets(&self, event_id: EventId) -> Result<u64> {
        let bookings = self
            .env
            .bookings
            .list_active_bookings_by_event(event_id)
            .await?;

        Ok(bookings
            .iter()
            .map(|booking| u64::from(booking.ticket_count))
            .sum())
    }

    /// Figures for an event already in hand.
    pub(crate) async fn snapshot_of(&self, event: &Event) -> Result<CapacitySnapshot> {
        let booked = self.booked_tickets(event.id).await?;
        let capacity = event.capacity();

        Ok(CapacitySnapshot {
            event_id: event.id,
            capacity,
            booked,
            remaining: capacity.remaining_after(booked),
        })
    }
}
