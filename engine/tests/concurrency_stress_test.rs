//! Concurrency stress tests for last-ticket scenarios.
//!
//! These tests verify that under heavy concurrent load, admission never
//! oversells an event and never lets one user hold two active bookings.
//!
//! Run with: `cargo test --test concurrency_stress_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use booking_core::{BookingError, ErrorKind, Event, User};
use booking_engine::{BookingEngine, BookingEnvironment, EngineConfig};
use booking_testing::helpers::{EventDetailsBuilder, attendee, organizer};
use booking_testing::{InMemoryStore, test_clock, test_epoch};
use chrono::Duration;
use futures::future::join_all;
use std::sync::Arc;

struct Setup {
    engine: BookingEngine,
    store: Arc<InMemoryStore>,
    olga: User,
}

async fn setup(config: EngineConfig) -> Setup {
    let store = Arc::new(InMemoryStore::new());
    let env = BookingEnvironment::from_store(store.clone(), Arc::new(test_clock()));
    let engine = BookingEngine::new(env, config);
    let olga = engine.register_user(organizer("olga")).await.unwrap();
    Setup {
        engine,
        store,
        olga,
    }
}

async fn published(setup: &Setup, location: &str, capacity: u32) -> Event {
    let details = EventDetailsBuilder::new(test_epoch() + Duration::days(7))
        .location(location)
        .capacity(capacity)
        .build();
    let event = setup.engine.create_event(setup.olga.id, details).await.unwrap();
    setup
        .engine
        .publish_event(event.id, setup.olga.id)
        .await
        .unwrap()
}

async fn attendees(setup: &Setup, count: usize) -> Vec<User> {
    let mut users = Vec::with_capacity(count);
    for i in 0..count {
        users.push(
            setup
                .engine
                .register_user(attendee(&format!("user{i:03}")))
                .await
                .unwrap(),
        );
    }
    users
}

/// Fire one booking request per `(user, tickets)` pair, all at once.
async fn race(
    setup: &Setup,
    event: &Event,
    requests: Vec<(User, u32)>,
) -> Vec<Result<booking_core::Booking, BookingError>> {
    let handles = requests.into_iter().map(|(user, tickets)| {
        let engine = setup.engine.clone();
        let event_id = event.id;
        tokio::spawn(async move { engine.create_booking(user.id, event_id, tickets).await })
    });

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("booking task panicked"))
        .collect()
}

/// Test: 100 concurrent booking attempts for 1 ticket.
///
/// Verifies that:
/// - Exactly 1 booking succeeds
/// - Exactly 99 bookings fail with `InsufficientCapacity`
/// - No overselling occurs
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_last_ticket_concurrency_100_requests() {
    println!("🧪 Concurrency Stress Test: 100 concurrent requests for 1 ticket");

    let setup = setup(EngineConfig::default()).await;
    let event = published(&setup, "Small Room", 1).await;
    let users = attendees(&setup, 100).await;

    let results = race(&setup, &event, users.into_iter().map(|u| (u, 1)).collect()).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let sold_out = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::InsufficientCapacity { .. })))
        .count();

    println!("  ✅ Successes: {successes}, sold out: {sold_out}");
    assert_eq!(successes, 1, "exactly one request must win the last ticket");
    assert_eq!(sold_out, 99);
    assert_eq!(setup.store.active_tickets(event.id), 1);
}

/// Test: 50 concurrent single-ticket requests for 3 tickets.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_three_tickets_50_requests() {
    let setup = setup(EngineConfig::default()).await;
    let event = published(&setup, "Studio", 3).await;
    let users = attendees(&setup, 50).await;

    let results = race(&setup, &event, users.into_iter().map(|u| (u, 1)).collect()).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 3);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BookingError::InsufficientCapacity { .. }))
    );
    assert_eq!(setup.engine.remaining_capacity(event.id).await.unwrap(), 0);
}

/// Test: mixed ticket counts never exceed capacity.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_mixed_ticket_counts_never_oversell() {
    let setup = setup(EngineConfig::default()).await;
    let event = published(&setup, "Hall", 20).await;
    let users = attendees(&setup, 40).await;
    let requests = users
        .into_iter()
        .enumerate()
        .map(|(i, u)| (u, u32::try_from(i % 3).unwrap() + 1))
        .collect();

    let results = race(&setup, &event, requests).await;

    let admitted: u64 = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|b| u64::from(b.ticket_count))
        .sum();
    assert!(admitted <= 20, "admitted {admitted} tickets for capacity 20");
    assert_eq!(setup.store.active_tickets(event.id), admitted);

    let snapshot = setup.engine.capacity_snapshot(event.id).await.unwrap();
    assert_eq!(u64::from(snapshot.remaining) + admitted, 20);
    // Any refusal happened because fewer tickets remained than were requested.
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::AdmissionRejected)
    );
}

/// Test: the same user racing against themselves gets one booking.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_duplicate_requests_from_one_user() {
    let setup = setup(EngineConfig::default()).await;
    let event = published(&setup, "Hall", 100).await;
    let alice = attendees(&setup, 1).await.remove(0);

    let requests = (0..20).map(|_| (alice.clone(), 1)).collect();
    let results = race(&setup, &event, requests).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BookingError::AlreadyBooked { .. }))
    );
    assert_eq!(setup.engine.bookings_for_user(alice.id).await.unwrap().len(), 1);
}

/// Test: two racing cancellations of one booking.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancellations_single_winner() {
    let setup = setup(EngineConfig::default()).await;
    let event = published(&setup, "Hall", 5).await;
    let alice = attendees(&setup, 1).await.remove(0);
    let booking = setup
        .engine
        .create_booking(alice.id, event.id, 2)
        .await
        .unwrap();

    let booking_id = booking.id;
    let handles = (0..2).map(|_| {
        let engine = setup.engine.clone();
        tokio::spawn(async move { engine.cancel_booking(booking_id).await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::InvalidTransition)
    );
    assert_eq!(setup.engine.remaining_capacity(event.id).await.unwrap(), 5);
}

/// Test: a held lock on one event does not delay admission to another.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_events_do_not_block_each_other() {
    let mut config = EngineConfig::default();
    config.admission.lock_timeout_ms = 500;
    let setup = setup(config).await;
    let busy = published(&setup, "Busy Hall", 5).await;
    let free = published(&setup, "Free Hall", 5).await;
    let alice = attendees(&setup, 1).await.remove(0);

    let locks = setup.engine.locks();
    let _held = locks.acquire(busy.id).await.unwrap();

    let started = std::time::Instant::now();
    assert!(setup.engine.create_booking(alice.id, free.id, 1).await.is_ok());
    assert!(started.elapsed() < std::time::Duration::from_millis(500));

    let err = setup
        .engine
        .create_booking(alice.id, busy.id, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert_eq!(setup.store.active_tickets(busy.id), 0);
}

/// Test: event cancellation racing with admission leaves only bookings admitted
/// while the event was still published.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_event_cancellation_racing_with_admission() {
    let setup = setup(EngineConfig::default()).await;
    let event = published(&setup, "Hall", 50).await;
    let users = attendees(&setup, 30).await;

    let cancel = {
        let engine = setup.engine.clone();
        let event_id = event.id;
        tokio::spawn(async move { engine.cancel_event(event_id).await })
    };
    let results = race(&setup, &event, users.into_iter().map(|u| (u, 1)).collect()).await;
    cancel.await.unwrap().unwrap();

    let admitted = u64::try_from(results.iter().filter(|r| r.is_ok()).count()).unwrap();
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BookingError::EventNotPublished { .. }))
    );
    assert_eq!(setup.store.active_tickets(event.id), admitted);
}
