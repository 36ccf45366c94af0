//! Retry policy: decides whether and when a failed item is tried again.

use std::time::Duration;

use super::QueueItem;

/// Outcome of a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue after `delay`.
    Retry { delay: Duration },
    /// Budget exhausted; count the item as failed.
    GiveUp,
}

/// Linear backoff: the n-th retry waits `base_delay * n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    /// Delay before the `retry_number`-th retry (1-indexed).
    ///
    /// Example with base_delay=1s:
    /// - retry 1: 1s
    /// - retry 2: 2s
    /// - retry 3: 3s
    pub fn next_delay(&self, retry_number: u32) -> Duration {
        self.base_delay.saturating_mul(retry_number.max(1))
    }

    /// Decide what to do with an item whose delivery just failed.
    pub fn decide(&self, item: &QueueItem) -> RetryDecision {
        if item.can_retry() {
            RetryDecision::Retry {
                delay: self.next_delay(item.retry_count + 1),
            }
        } else {
            RetryDecision::GiveUp
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
