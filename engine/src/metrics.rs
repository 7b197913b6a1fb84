//! Business metrics for the booking engine.
//!
//! Counters are recorded through the `metrics` facade. No exporter is installed here;
//! the host process decides where they go.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_admissions_total{outcome}` - Admission decisions by outcome
//! - `booking_tickets_confirmed_total` - Tickets admitted
//! - `booking_cancellations_total` - Bookings cancelled
//! - `booking_event_transitions_total{status}` - Event status changes by target status
//! - `booking_users_registered_total` - Users registered

use booking_core::{BookingError, EventStatus};
use metrics::{counter, describe_counter};

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "booking_admissions_total",
        "Booking admission decisions by outcome (admitted or the rejection reason)"
    );
    describe_counter!(
        "booking_tickets_confirmed_total",
        "Total number of tickets admitted"
    );
    describe_counter!(
        "booking_cancellations_total",
        "Total number of bookings cancelled"
    );
    describe_counter!(
        "booking_event_transitions_total",
        "Event status transitions by target status (draft, published, cancelled)"
    );
    describe_counter!(
        "booking_users_registered_total",
        "Total number of users registered"
    );

    tracing::info!("Business metrics registered");
}

/// Record a successful admission of `tickets`.
pub fn record_admitted(tickets: u32) {
    counter!("booking_admissions_total", "outcome" => "admitted").increment(1);
    counter!("booking_tickets_confirmed_total").increment(u64::from(tickets));
}

/// Record a refused admission.
pub fn record_rejected(error: &BookingError) {
    counter!("booking_admissions_total", "outcome" => rejection_label(error)).increment(1);
}

/// Record a booking cancellation.
pub fn record_cancellation() {
    counter!("booking_cancellations_total").increment(1);
}

/// Record an event entering `status`.
pub fn record_event_transition(status: EventStatus) {
    let label = match status {
        EventStatus::Draft => "draft",
        EventStatus::Published => "published",
        EventStatus::Cancelled => "cancelled",
    };
    counter!("booking_event_transitions_total", "status" => label).increment(1);
}

/// Record a user registration.
pub fn record_user_registered() {
    counter!("booking_users_registered_total").increment(1);
}

const fn rejection_label(error: &BookingError) -> &'static str {
    match error {
        BookingError::ActorNotFound(_) => "actor_not_found",
        BookingError::EventNotFound(_) => "event_not_found",
        BookingError::SelfBookingNotAllowed { .. } => "self_booking",
        BookingError::AlreadyBooked { .. } => "already_booked",
        BookingError::EventNotPublished { .. } => "not_published",
        BookingError::EventAlreadyStarted { .. } => "already_started",
        BookingError::InsufficientCapacity { .. } => "insufficient_capacity",
        BookingError::InvalidInput { .. } => "invalid_input",
        BookingError::Storage(_) => "storage_failure",
        _ => "other",
    }
}
