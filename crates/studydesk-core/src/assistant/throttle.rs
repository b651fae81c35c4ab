//! Minimum-interval gate in front of the chat-completion service.
//!
//! Single-flight: a caller holds the [`ThrottlePermit`] across the wait and the dispatch,
//! so concurrent callers queue on the lock and each one sees the timestamp left by the
//! previous dispatch.

use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

pub struct Throttle {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

pub struct ThrottlePermit<'a> {
    last_dispatch: MutexGuard<'a, Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits for the gate, then sleeps out whatever remains of the minimum interval.
    pub async fn acquire(&self) -> ThrottlePermit<'_> {
        let guard = self.last_dispatch.lock().await;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!("[ASSISTANT] Throttled for {:?}.", wait);
                tokio::time::sleep(wait).await;
            }
        }
        ThrottlePermit {
            last_dispatch: guard,
        }
    }

    pub async fn last_dispatch(&self) -> Option<Instant> {
        *self.last_dispatch.lock().await
    }
}

impl ThrottlePermit<'_> {
    /// Records a dispatch at the current instant.
    pub fn mark_dispatched(&mut self) {
        *self.last_dispatch = Some(Instant::now());
    }
}
