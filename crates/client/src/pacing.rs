//! Pacing of outbound fetches to the archive.
//!
//! Every fetch, whichever request triggered it, reserves a slot first. Slots
//! are handed out at least `delay` apart, so concurrent callers line up on a
//! ladder of distinct instants in the order they asked.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Serializes and paces outbound fetches.
#[derive(Debug)]
pub struct LoadDistributor {
    next_available: Mutex<Option<Instant>>,
    delay: Duration,
}

impl LoadDistributor {
    pub fn new(delay: Duration) -> Self {
        Self { next_available: Mutex::new(None), delay }
    }

    /// Reserve the next fetch slot, waiting until it arrives.
    ///
    /// Returns the instant of the reserved slot.
    pub async fn reserve_slot(&self) -> Instant {
        let slot = self.claim(Instant::now());
        tokio::time::sleep_until(slot).await;
        slot
    }

    /// Check-and-advance step; the lock is released before any waiting.
    fn claim(&self, now: Instant) -> Instant {
        let mut next = self.next_available.lock();
        let slot = match *next {
            Some(last) if last + self.delay >= now => last + self.delay,
            _ => now,
        };
        *next = Some(slot);
        slot
    }
}
