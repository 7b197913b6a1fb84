//! Per-event exclusive sections.
//!
//! Admission for one event is single-writer at the moment of decision: the capacity
//! read and the booking write happen while holding that event's guard. Different
//! events hand out different mutexes, so they never wait on each other.
//!
//! Acquisition is bounded. A caller that cannot get the guard within the configured
//! timeout fails with [`StoreError::LockTimeout`] instead of queueing forever.

use booking_core::{EventId, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive hold on one event. Released on drop.
#[derive(Debug)]
pub struct EventGuard {
    event_id: EventId,
    _guard: OwnedMutexGuard<()>,
}

impl EventGuard {
    /// Event this guard protects
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }
}

/// Registry of per-event mutexes.
#[derive(Debug)]
pub struct EventLocks {
    locks: Mutex<HashMap<EventId, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
    soft_limit: usize,
}

impl EventLocks {
    /// Creates a registry whose acquisitions wait at most `timeout`.
    ///
    /// Once more than `soft_limit` mutexes are registered, entries nobody holds or
    /// waits on are dropped.
    #[must_use]
    pub fn new(timeout: Duration, soft_limit: usize) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
            soft_limit,
        }
    }

    /// Wait for exclusive access to `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockTimeout`] if the guard is not obtained within the
    /// configured timeout.
    pub async fn acquire(&self, event_id: EventId) -> Result<EventGuard, StoreError> {
        let lock = self.lock_for(event_id);

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(EventGuard {
                event_id,
                _guard: guard,
            }),
            Err(_) => {
                tracing::warn!(
                    event_id = %event_id,
                    timeout_ms = self.timeout_ms(),
                    "Timed out waiting for event lock"
                );
                Err(StoreError::LockTimeout {
                    resource: format!("event {event_id}"),
                    waited_ms: self.timeout_ms(),
                })
            }
        }
    }

    /// Number of mutexes currently registered
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no mutex is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_for(&self, event_id: EventId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        if locks.len() >= self.soft_limit && !locks.contains_key(&event_id) {
            // Only the registry holds an idle entry.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks
            .entry(event_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
