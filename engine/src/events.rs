//! Event lifecycle: creation, edits and the Draft → Published → Cancelled state machine.
//!
//! Every mutation runs under the event's guard from [`EventLocks`], so a status change
//! or a capacity edit can never interleave with an admission decision for the same
//! event.

use crate::capacity::CapacityAccountant;
use crate::config::UpdatePolicy;
use crate::environment::BookingEnvironment;
use crate::locks::EventLocks;
use crate::metrics;
use booking_core::{
    BookingError, Constraint, EntityKind, Event, EventDetails, EventId, EventStatus,
    EventUpdate, ListingKey, Result, StoreError, UserId, UserRole,
};
use std::sync::Arc;

const TITLE_MIN_CHARS: usize = 3;
const TITLE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 2000;

/// Validate the text fields of an event.
///
/// # Errors
///
/// Returns [`BookingError::InvalidInput`] if the title is blank or outside 3-100
/// characters, the description is blank or exceeds 2000 characters, or the location
/// is blank.
pub fn validate_text(details: &EventDetails) -> Result<()> {
    let title_chars = details.title.chars().count();
    if details.title.trim().is_empty() {
        return Err(BookingError::invalid_input("title", "must not be blank"));
    }
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&title_chars) {
        return Err(BookingError::invalid_input(
            "title",
            format!("must be {TITLE_MIN_CHARS}-{TITLE_MAX_CHARS} characters, got {title_chars}"),
        ));
    }

    if details.description.trim().is_empty() {
        return Err(BookingError::invalid_input("description", "must not be blank"));
    }
    let description_chars = details.description.chars().count();
    if description_chars > DESCRIPTION_MAX_CHARS {
        return Err(BookingError::invalid_input(
            "description",
            format!("must be at most {DESCRIPTION_MAX_CHARS} characters, got {description_chars}"),
        ));
    }

    if details.location.trim().is_empty() {
        return Err(BookingError::invalid_input("location", "must not be blank"));
    }

    Ok(())
}

/// Validate the schedule of an event.
///
/// # Errors
///
/// Returns [`BookingError::InvalidInput`] if the end is not strictly after the start.
pub fn validate_schedule(details: &EventDetails) -> Result<()> {
    if details.ends_at <= details.starts_at {
        return Err(BookingError::invalid_input(
            "ends_at",
            format!(
                "must be after the start ({} <= {})",
                details.ends_at, details.starts_at
            ),
        ));
    }
    Ok(())
}

/// Validate the capacity of an event.
///
/// # Errors
///
/// Returns [`BookingError::InvalidInput`] if the capacity is zero.
pub fn validate_capacity(details: &EventDetails) -> Result<()> {
    if details.capacity.value() == 0 {
        return Err(BookingError::invalid_input("capacity", "must be at least 1"));
    }
    Ok(())
}

/// Validate every field rule of an event.
///
/// # Errors
///
/// Returns the first [`BookingError::InvalidInput`] found.
pub fn validate_details(details: &EventDetails) -> Result<()> {
    validate_text(details)?;
    validate_schedule(details)?;
    validate_capacity(details)
}

fn invalid_transition(event: &Event, action: &'static str) -> BookingError {
    BookingError::InvalidTransition {
        entity: EntityKind::Event,
        id: *event.id.as_uuid(),
        status: event.status.as_str(),
        action,
    }
}

fn listing_conflict(error: StoreError, key: ListingKey) -> BookingError {
    match error {
        StoreError::UniqueViolation {
            constraint: Constraint::EventListing,
        } => BookingError::DuplicateEvent {
            owner_id: key.owner_id,
            starts_at: key.starts_at,
            location: key.location,
        },
        other => BookingError::Storage(other),
    }
}

/// Owns the event state machine and its listing uniqueness.
#[derive(Clone, Debug)]
pub struct EventLifecycle {
    env: BookingEnvironment,
    locks: Arc<EventLocks>,
    capacity: CapacityAccountant,
    update_policy: UpdatePolicy,
}

impl EventLifecycle {
    /// Creates the event lifecycle manager
    #[must_use]
    pub fn new(env: BookingEnvironment, locks: Arc<EventLocks>, update_policy: UpdatePolicy) -> Self {
        Self {
            capacity: CapacityAccountant::new(env.clone()),
            env,
            locks,
            update_policy,
        }
    }

    /// Create a Draft event owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidInput`] if a field rule fails or the start is not in
    ///   the future
    /// - [`BookingError::ActorNotFound`] if the owner is unknown
    /// - [`BookingError::RoleNotPermitted`] if the owner is not an Organizer
    /// - [`BookingError::DuplicateEvent`] if the owner already lists an event at this
    ///   start and location
    /// - [`BookingError::Storage`] if the store fails
    pub async fn create_event(&self, owner_id: UserId, details: EventDetails) -> Result<Event> {
        tracing::debug!(owner_id = %owner_id, title = %details.title, "Creating event");

        let now = self.env.clock.now();
        validate_details(&details)?;
        if details.starts_at <= now {
            return Err(BookingError::invalid_input(
                "starts_at",
                "must be in the future",
            ));
        }

        let owner = self
            .env
            .users
            .find_user(owner_id)
            .await?
            .ok_or(BookingError::ActorNotFound(owner_id))?;

        if !owner.has_role(UserRole::Organizer) {
            tracing::warn!(owner_id = %owner_id, role = %owner.role, "Non-organizer tried to create an event");
            return Err(BookingError::RoleNotPermitted {
                role: owner.role,
                action: "create events",
            });
        }

        let event = Event::new(EventId::new(), owner_id, details, now);
        let key = event.listing_key();
        if self.env.events.listing_exists(&key).await? {
            return Err(listing_conflict(
                StoreError::UniqueViolation {
                    constraint: Constraint::EventListing,
                },
                key,
            ));
        }

        let event = self
            .env
            .events
            .insert_event(event)
            .await
            .map_err(|e| listing_conflict(e, key))?;

        metrics::record_event_transition(EventStatus::Draft);
        tracing::info!(event_id = %event.id, owner_id = %owner_id, "Event created");
        Ok(event)
    }

    /// Apply the supplied fields of `update` to the event.
    ///
    /// An update without any field returns the event unchanged without writing.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`] if the event does not exist
    /// - [`BookingError::InvalidTransition`] if the update policy forbids editing the
    ///   event in its current status
    /// - [`BookingError::InvalidInput`] if the merged event breaks a field rule or
    ///   the new capacity is below the tickets already booked
    /// - [`BookingError::DuplicateEvent`] if the new start or location collides with
    ///   another listing of the owner
    /// - [`BookingError::Storage`] if the store fails or the lock times out
    pub async fn update_event(&self, event_id: EventId, update: EventUpdate) -> Result<Event> {
        tracing::debug!(event_id = %event_id, "Updating event");

        if update.is_empty() {
            return self.find_event(event_id).await;
        }

        let _guard = self.locks.acquire(event_id).await?;
        let event = self.find_event(event_id).await?;

        if self.update_policy == UpdatePolicy::DraftOnly && event.status != EventStatus::Draft {
            return Err(invalid_transition(&event, "update"));
        }

        let details = update.merge_into(&event.details);
        validate_details(&details)?;

        if details.capacity != event.details.capacity {
            let booked = self.capacity.booked_tickets(event_id).await?;
            if u64::from(details.capacity.value()) < booked {
                return Err(BookingError::invalid_input(
                    "capacity",
                    format!(
                        "cannot drop to {} below the {booked} tickets already booked",
                        details.capacity.value()
                    ),
                ));
            }
        }

        let updated = event.with_details(details, self.env.clock.now());
        let key = updated.listing_key();
        if key != event.listing_key() && self.env.events.listing_exists(&key).await? {
            return Err(listing_conflict(
                StoreError::UniqueViolation {
                    constraint: Constraint::EventListing,
                },
                key,
            ));
        }

        let stored = self
            .env
            .events
            .update_event(updated, event.version)
            .await
            .map_err(|e| listing_conflict(e, key))?;

        tracing::info!(event_id = %event_id, version = %stored.version, "Event updated");
        Ok(stored)
    }

    /// Move a Draft event to Published on behalf of its owner.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`] if the event does not exist
    /// - [`BookingError::NotOwner`] if `requester_id` does not own the event
    /// - [`BookingError::RoleNotPermitted`] if the owner is no longer an Organizer
    /// - [`BookingError::InvalidTransition`] if the event is not a Draft
    /// - [`BookingError::Storage`] if the store fails or the lock times out
    pub async fn publish_event(&self, event_id: EventId, requester_id: UserId) -> Result<Event> {
        tracing::debug!(event_id = %event_id, requester_id = %requester_id, "Publishing event");

        let _guard = self.locks.acquire(event_id).await?;
        let event = self.find_event(event_id).await?;

        if !event.is_owned_by(requester_id) {
            tracing::warn!(event_id = %event_id, requester_id = %requester_id, "Publish refused: not the owner");
            return Err(BookingError::NotOwner {
                event_id,
                user_id: requester_id,
            });
        }

        let owner = self
            .env
            .users
            .find_user(event.owner_id)
            .await?
            .ok_or(BookingError::ActorNotFound(event.owner_id))?;
        if !owner.has_role(UserRole::Organizer) {
            tracing::warn!(event_id = %event_id, role = %owner.role, "Publish refused: owner is no longer an organizer");
            return Err(BookingError::RoleNotPermitted {
                role: owner.role,
                action: "publish events",
            });
        }

        if event.status != EventStatus::Draft {
            return Err(invalid_transition(&event, "publish"));
        }

        self.transition(event, EventStatus::Published).await
    }

    /// Cancel an event that is not already cancelled.
    ///
    /// Bookings of the event are left as they are.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`] if the event does not exist
    /// - [`BookingError::InvalidTransition`] if the event is already cancelled
    /// - [`BookingError::Storage`] if the store fails or the lock times out
    pub async fn cancel_event(&self, event_id: EventId) -> Result<()> {
        tracing::debug!(event_id = %event_id, "Cancelling event");

        let _guard = self.locks.acquire(event_id).await?;
        let event = self.find_event(event_id).await?;

        if !event.status.can_transition_to(EventStatus::Cancelled) {
            return Err(invalid_transition(&event, "cancel"));
        }

        self.transition(event, EventStatus::Cancelled).await?;
        Ok(())
    }

    async fn transition(&self, event: Event, status: EventStatus) -> Result<Event> {
        let expected = event.version;
        let stored = self
            .env
            .events
            .update_event(event.with_status(status, self.env.clock.now()), expected)
            .await?;

        metrics::record_event_transition(status);
        tracing::info!(event_id = %stored.id, status = %stored.status, "Event status changed");
        Ok(stored)
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`] if the event does not exist
    /// - [`BookingError::Storage`] if the store fails
    pub async fn find_event(&self, event_id: EventId) -> Result<Event> {
        self.env
            .events
            .find_event(event_id)
            .await?
            .ok_or(BookingError::EventNotFound(event_id))
    }

    /// All events.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        Ok(self.env.events.list_events().await?)
    }

    /// Events in `status`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    pub async fn list_events_by_status(&self, status: EventStatus) -> Result<Vec<Event>> {
        Ok(self.env.events.list_events_by_status(status).await?)
    }

    /// Events owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    pub async fn list_events_by_owner(&self, owner_id: UserId) -> Result<Vec<Event>> {
        Ok(self.env.events.list_events_by_owner(owner_id).await?)
    }

    /// Published events that have not started yet, soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the store fails.
    pub async fn upcoming_events(&self) -> Result<Vec<Event>> {
        let now = self.env.clock.now();
        let mut events: Vec<Event> = self
            .env
            .events
            .list_events_starting_after(now)
            .await?
            .into_iter()
            .filter(|event| event.status == EventStatus::Published)
            .collect();
        events.sort_by_key(|event| event.details.starts_at);
        Ok(events)
    }
}
