//! Shared minimum-interval gate across all workers.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Guarantees that no two deliveries start closer together than `interval`.
///
/// The waiting worker holds the gate while it sleeps, which serialises
/// delivery start times: throughput is capped at one delivery per interval
/// no matter how many workers there are.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_delivery_at: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_delivery_at: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a delivery may start, then claim the slot.
    pub async fn acquire(&self) {
        let mut last = self.last_delivery_at.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
