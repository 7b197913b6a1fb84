//! End-to-end scenarios through the `BookingEngine` facade.
//!
//! Run with: `cargo test --test scenarios`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use booking_core::{
    BookingError, BookingStatus, Capacity, ErrorKind, Event, EventStatus, EventUpdate, NewUser,
    User, UserRole,
};
use booking_engine::{BookingEngine, BookingEnvironment, EngineConfig, UpdatePolicy};
use booking_testing::helpers::{EventDetailsBuilder, attendee, init_test_tracing, organizer};
use booking_testing::{InMemoryStore, ManualClock, test_epoch};
use chrono::Duration;
use std::sync::Arc;

struct World {
    engine: BookingEngine,
    store: Arc<InMemoryStore>,
    clock: ManualClock,
    olga: User,
}

async fn world_with(config: EngineConfig) -> World {
    init_test_tracing();
    let store = Arc::new(InMemoryStore::new());
    let clock = ManualClock::new(test_epoch());
    let env = BookingEnvironment::from_store(store.clone(), Arc::new(clock.clone()));
    let engine = BookingEngine::new(env, config);
    let olga = engine.register_user(organizer("olga")).await.unwrap();

    World {
        engine,
        store,
        clock,
        olga,
    }
}

async fn world() -> World {
    world_with(EngineConfig::default()).await
}

impl World {
    async fn draft(&self, location: &str, capacity: u32) -> Event {
        let details = EventDetailsBuilder::new(test_epoch() + Duration::days(7))
            .location(location)
            .capacity(capacity)
            .build();
        self.engine.create_event(self.olga.id, details).await.unwrap()
    }

    async fn published(&self, location: &str, capacity: u32) -> Event {
        let event = self.draft(location, capacity).await;
        self.engine
            .publish_event(event.id, self.olga.id)
            .await
            .unwrap()
    }

    async fn attendee(&self, name: &str) -> User {
        self.engine.register_user(attendee(name)).await.unwrap()
    }
}

#[tokio::test]
async fn sold_out_event_refuses_the_next_ticket() {
    let w = world().await;
    let event = w.published("Arena", 10).await;
    let alice = w.attendee("alice").await;
    let bob = w.attendee("bob").await;

    let booking = w.engine.create_booking(alice.id, event.id, 10).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);

    let err = w.engine.create_booking(bob.id, event.id, 1).await.unwrap_err();
    assert_eq!(
        err,
        BookingError::InsufficientCapacity {
            event_id: event.id,
            requested: 1,
            remaining: 0
        }
    );
    assert_eq!(w.engine.remaining_capacity(event.id).await.unwrap(), 0);
}

#[tokio::test]
async fn second_booking_by_same_user_is_already_booked() {
    let w = world().await;
    let event = w.published("Studio", 5).await;
    let alice = w.attendee("alice").await;

    w.engine.create_booking(alice.id, event.id, 2).await.unwrap();
    let err = w.engine.create_booking(alice.id, event.id, 1).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(err, BookingError::AlreadyBooked { .. }));
    assert_eq!(w.store.booking_count(), 1);
}

#[tokio::test]
async fn owner_cannot_book_own_event() {
    let w = world().await;
    let event = w.published("Hall", 5).await;

    let err = w.engine.create_booking(w.olga.id, event.id, 1).await.unwrap_err();

    assert_eq!(
        err,
        BookingError::SelfBookingNotAllowed {
            event_id: event.id,
            user_id: w.olga.id
        }
    );
}

#[tokio::test]
async fn publish_guards() {
    let w = world().await;
    let event = w.published("Hall", 5).await;
    let oscar = w.engine.register_user(organizer("oscar")).await.unwrap();

    let err = w.engine.publish_event(event.id, w.olga.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let err = w.engine.publish_event(event.id, oscar.id).await.unwrap_err();
    assert!(matches!(err, BookingError::NotOwner { .. }));
}

#[tokio::test]
async fn cancelling_a_booking_frees_its_tickets() {
    let w = world().await;
    let event = w.published("Hall", 3).await;
    let alice = w.attendee("alice").await;
    let bob = w.attendee("bob").await;

    let booking = w.engine.create_booking(alice.id, event.id, 3).await.unwrap();
    assert!(w.engine.create_booking(bob.id, event.id, 1).await.is_err());

    w.engine.cancel_booking(booking.id).await.unwrap();

    assert_eq!(w.engine.remaining_capacity(event.id).await.unwrap(), 3);
    assert!(w.engine.create_booking(bob.id, event.id, 3).await.is_ok());
    // Full again.
    assert!(w.engine.create_booking(alice.id, event.id, 1).await.is_err());
    assert_eq!(w.engine.bookings_for_user(alice.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rebooking_after_cancellation_is_allowed() {
    let w = world().await;
    let event = w.published("Hall", 3).await;
    let alice = w.attendee("alice").await;

    let first = w.engine.create_booking(alice.id, event.id, 1).await.unwrap();
    w.engine.cancel_booking(first.id).await.unwrap();
    let second = w.engine.create_booking(alice.id, event.id, 2).await.unwrap();

    assert_ne!(first.id, second.id);
    let snapshot = w.engine.capacity_snapshot(event.id).await.unwrap();
    assert_eq!(snapshot.booked, 2);
    assert_eq!(snapshot.remaining, 1);
}

#[tokio::test]
async fn cancelled_rejections_never_mutate() {
    let w = world().await;
    let event = w.published("Hall", 3).await;
    let alice = w.attendee("alice").await;
    let booking = w.engine.create_booking(alice.id, event.id, 1).await.unwrap();

    w.engine.cancel_booking(booking.id).await.unwrap();
    w.engine.cancel_event(event.id).await.unwrap();
    let booking_after = w.engine.find_booking(booking.id).await.unwrap();
    let event_after = w.engine.find_event(event.id).await.unwrap();

    for _ in 0..3 {
        let err = w.engine.cancel_booking(booking.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        let err = w.engine.cancel_event(event.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    assert_eq!(w.engine.find_booking(booking.id).await.unwrap(), booking_after);
    assert_eq!(w.engine.find_event(event.id).await.unwrap(), event_after);
}

#[tokio::test]
async fn cancelling_an_event_leaves_bookings_and_closes_admission() {
    let w = world().await;
    let event = w.published("Hall", 5).await;
    let alice = w.attendee("alice").await;
    let bob = w.attendee("bob").await;
    let booking = w.engine.create_booking(alice.id, event.id, 2).await.unwrap();

    w.engine.cancel_event(event.id).await.unwrap();

    assert_eq!(
        w.engine.find_booking(booking.id).await.unwrap().status,
        BookingStatus::Confirmed
    );
    let err = w.engine.create_booking(bob.id, event.id, 1).await.unwrap_err();
    assert_eq!(
        err,
        BookingError::EventNotPublished {
            event_id: event.id,
            status: EventStatus::Cancelled
        }
    );
}

#[tokio::test]
async fn draft_event_cannot_be_booked_until_published() {
    let w = world().await;
    let event = w.draft("Hall", 5).await;
    let alice = w.attendee("alice").await;

    let err = w.engine.create_booking(alice.id, event.id, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AdmissionRejected);

    w.engine.publish_event(event.id, w.olga.id).await.unwrap();
    assert!(w.engine.create_booking(alice.id, event.id, 1).await.is_ok());
}

#[tokio::test]
async fn started_event_cannot_be_booked() {
    let w = world().await;
    let event = w.published("Hall", 5).await;
    let alice = w.attendee("alice").await;

    w.clock.set(event.details.starts_at + Duration::minutes(1));
    let err = w.engine.create_booking(alice.id, event.id, 1).await.unwrap_err();

    assert!(matches!(err, BookingError::EventAlreadyStarted { .. }));
    assert!(w.engine.upcoming_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn role_change_between_create_and_publish_is_caught() {
    let w = world().await;
    let event = w.draft("Hall", 5).await;

    w.store.set_user_role(w.olga.id, UserRole::Attendee);
    let err = w.engine.publish_event(event.id, w.olga.id).await.unwrap_err();

    assert!(matches!(err, BookingError::RoleNotPermitted { .. }));
}

#[tokio::test]
async fn attendees_cannot_create_events() {
    let w = world().await;
    let alice = w.attendee("alice").await;
    let details = EventDetailsBuilder::new(test_epoch() + Duration::days(3)).build();

    let err = w.engine.create_event(alice.id, details).await.unwrap_err();

    assert_eq!(
        err,
        BookingError::RoleNotPermitted {
            role: UserRole::Attendee,
            action: "create events"
        }
    );
}

#[tokio::test]
async fn duplicate_listing_is_rejected_at_creation() {
    let w = world().await;
    w.draft("Hall", 5).await;

    let details = EventDetailsBuilder::new(test_epoch() + Duration::days(7))
        .location("Hall")
        .title("Another show")
        .build();
    let err = w.engine.create_event(w.olga.id, details).await.unwrap_err();

    assert!(matches!(err, BookingError::DuplicateEvent { .. }));
    assert_eq!(w.engine.list_events().await.unwrap().len(), 1);
}

#[tokio::test]
async fn draft_only_policy_freezes_published_events() {
    let mut config = EngineConfig::default();
    config.lifecycle.update_policy = UpdatePolicy::DraftOnly;
    let w = world_with(config).await;
    let draft = w.draft("Hall", 5).await;
    let published = w.published("Annex", 5).await;
    let grow = EventUpdate {
        capacity: Some(Capacity::new(50)),
        ..EventUpdate::default()
    };

    assert!(w.engine.update_event(draft.id, grow.clone()).await.is_ok());
    let err = w.engine.update_event(published.id, grow).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn growing_capacity_admits_more() {
    let w = world().await;
    let event = w.published("Hall", 1).await;
    let alice = w.attendee("alice").await;
    let bob = w.attendee("bob").await;
    w.engine.create_booking(alice.id, event.id, 1).await.unwrap();

    w.engine
        .update_event(
            event.id,
            EventUpdate {
                capacity: Some(Capacity::new(2)),
                ..EventUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(w.engine.create_booking(bob.id, event.id, 1).await.is_ok());
}

#[tokio::test]
async fn registration_rules() {
    let w = world().await;

    let err = w
        .engine
        .register_user(NewUser::new("admin", "admin@example.com", UserRole::Administrator))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotPermitted);

    let err = w.engine.register_user(attendee("olga")).await.unwrap_err();
    assert_eq!(err, BookingError::UserAlreadyExists("olga@example.com".into()));

    let err = w
        .engine
        .register_user(NewUser::new("olga", "olga.two@example.com", UserRole::Attendee))
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::UsernameTaken("olga".into()));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = w
        .engine
        .register_user(NewUser::new("x", "x@example.com", UserRole::Attendee))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(w.engine.list_users().await.unwrap(), vec![w.olga.clone()]);
}

#[tokio::test]
async fn reads_by_owner_status_user_and_event() {
    let w = world().await;
    let draft = w.draft("Hall", 5).await;
    let published = w.published("Annex", 5).await;
    let alice = w.attendee("alice").await;
    let booking = w.engine.create_booking(alice.id, published.id, 1).await.unwrap();

    assert_eq!(
        w.engine.list_events_by_owner(w.olga.id).await.unwrap().len(),
        2
    );
    assert_eq!(
        w.engine.list_events_by_status(EventStatus::Draft).await.unwrap(),
        vec![draft]
    );
    assert_eq!(
        w.engine.upcoming_events().await.unwrap(),
        vec![w.engine.find_event(published.id).await.unwrap()]
    );
    assert_eq!(
        w.engine.bookings_for_user(alice.id).await.unwrap(),
        vec![booking.clone()]
    );
    assert_eq!(
        w.engine.bookings_for_event(published.id).await.unwrap(),
        vec![booking]
    );
    assert_eq!(
        w.engine.find_user_by_email("alice@example.com").await.unwrap(),
        Some(alice)
    );
}

#[tokio::test]
async fn storage_failure_is_opaque_and_writes_nothing() {
    let w = world().await;
    let event = w.published("Hall", 5).await;
    let alice = w.attendee("alice").await;

    w.store.set_unavailable(true);
    let booking_err = w.engine.create_booking(alice.id, event.id, 1).await.unwrap_err();
    let cancel_err = w.engine.cancel_event(event.id).await.unwrap_err();
    w.store.set_unavailable(false);

    assert_eq!(booking_err.kind(), ErrorKind::StorageFailure);
    assert_eq!(cancel_err.kind(), ErrorKind::StorageFailure);
    assert_eq!(w.store.booking_count(), 0);
    assert_eq!(
        w.engine.find_event(event.id).await.unwrap().status,
        EventStatus::Published
    );
}
