//! Booking Engine Demo
//!
//! Walks through the engine's main behaviours against the in-memory store:
//! - Selling an event out and refusing the next request
//! - Duplicate and self bookings
//! - Two concurrent requests racing for the last ticket
//! - Publish guards (already published, not the owner)
//! - Cancellation freeing capacity
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=booking_engine=debug cargo run --bin demo
//! ```

use booking_core::environment::SystemClock;
use booking_core::{BookingError, Event, User};
use booking_engine::metrics::register_business_metrics;
use booking_engine::{BookingEngine, BookingEnvironment, EngineConfig};
use booking_testing::InMemoryStore;
use booking_testing::helpers::{EventDetailsBuilder, attendee, organizer};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn outcome<T>(result: &Result<T, BookingError>) -> String {
    match result {
        Ok(_) => "✓ accepted".to_string(),
        Err(error) => format!("✗ {error} [{:?}]", error.kind()),
    }
}

async fn published_event(
    engine: &BookingEngine,
    owner: &User,
    title: &str,
    capacity: u32,
) -> Result<Event, BookingError> {
    let details = EventDetailsBuilder::new(Utc::now() + Duration::days(14))
        .title(title)
        .location(title)
        .capacity(capacity)
        .build();
    let event = engine.create_event(owner.id, details).await?;
    engine.publish_event(event.id, owner.id).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booking_engine=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    register_business_metrics();

    println!("\n🎫 ============================================");
    println!("   Booking Engine - Live Demo");
    println!("============================================\n");

    let config = EngineConfig::from_env();
    println!("⚙️  Configuration: {}\n", serde_json::to_string(&config)?);

    let store = Arc::new(InMemoryStore::new());
    let env = BookingEnvironment::from_store(store, Arc::new(SystemClock));
    let engine = BookingEngine::new(env, config);

    let olga = engine.register_user(organizer("olga")).await?;
    let alice = engine.register_user(attendee("alice")).await?;
    let bob = engine.register_user(attendee("bob")).await?;
    let carol = engine.register_user(attendee("carol")).await?;

    // ========== Sold out ==========
    println!("1️⃣  Capacity 10: Alice books 10, then Bob asks for 1");
    let gala = published_event(&engine, &olga, "Spring Gala", 10).await?;
    let alice_gala = engine.create_booking(alice.id, gala.id, 10).await;
    println!("   Alice x10: {}", outcome(&alice_gala));
    println!(
        "   Bob x1:    {}",
        outcome(&engine.create_booking(bob.id, gala.id, 1).await)
    );
    println!(
        "   Snapshot:  {}\n",
        serde_json::to_string(&engine.capacity_snapshot(gala.id).await?)?
    );

    // ========== Duplicate booking ==========
    println!("2️⃣  Capacity 5: Alice books twice");
    let workshop = published_event(&engine, &olga, "Rust Workshop", 5).await?;
    println!(
        "   First:  {}",
        outcome(&engine.create_booking(alice.id, workshop.id, 2).await)
    );
    println!(
        "   Second: {}\n",
        outcome(&engine.create_booking(alice.id, workshop.id, 1).await)
    );

    // ========== Self booking ==========
    println!("3️⃣  Olga books her own event");
    println!(
        "   {}\n",
        outcome(&engine.create_booking(olga.id, workshop.id, 1).await)
    );

    // ========== Race for the last ticket ==========
    println!("4️⃣  Capacity 1: Bob and Carol race for the only ticket");
    let recital = published_event(&engine, &olga, "Piano Recital", 1).await?;
    let (recital_id, bob_id, carol_id) = (recital.id, bob.id, carol.id);
    let (bob_engine, carol_engine) = (engine.clone(), engine.clone());
    let bob_task =
        tokio::spawn(async move { bob_engine.create_booking(bob_id, recital_id, 1).await });
    let carol_task =
        tokio::spawn(async move { carol_engine.create_booking(carol_id, recital_id, 1).await });
    println!("   Bob:   {}", outcome(&bob_task.await?));
    println!("   Carol: {}", outcome(&carol_task.await?));
    println!(
        "   Remaining: {}\n",
        engine.remaining_capacity(recital_id).await?
    );

    // ========== Publish guards ==========
    println!("5️⃣  Publish guards");
    println!(
        "   Publish again:        {}",
        outcome(&engine.publish_event(gala.id, olga.id).await)
    );
    println!(
        "   Publish as non-owner: {}\n",
        outcome(&engine.publish_event(gala.id, alice.id).await)
    );

    // ========== Cancellation frees capacity ==========
    println!("6️⃣  Alice cancels her Spring Gala booking");
    if let Ok(booking) = alice_gala {
        engine.cancel_booking(booking.id).await?;
        println!(
            "   Remaining after cancel: {}",
            engine.remaining_capacity(gala.id).await?
        );
        println!(
            "   Cancel again:           {}",
            outcome(&engine.cancel_booking(booking.id).await)
        );
    }

    println!("\n✓ Demo complete");
    Ok(())
}
