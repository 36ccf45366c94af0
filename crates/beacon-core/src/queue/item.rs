//! Queue item: payload + priority + retry bookkeeping.

use tokio::time::Instant;

use crate::domain::{NotificationId, Payload, Priority};

/// One unit of queued work.
///
/// Ownership moves at every hand-off (enqueue -> store/channel -> worker ->
/// retry timer -> enqueue), so an item is never shared between tasks.
///
/// Retry accounting:
/// - `retry_count` counts retries already scheduled for this notification.
/// - `max_retries` is the budget left for *this* instance; every retry
///   re-enqueues a new instance with one less.
/// So `retry_count + max_retries` stays equal to the budget the notification
/// was first enqueued with.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: NotificationId,
    pub payload: Payload,
    pub priority: Priority,
    pub enqueued_at: Instant,

    /// Tie-break for items enqueued at the same instant.
    pub(crate) sequence: u64,

    pub retry_count: u32,
    pub max_retries: u32,
}

impl QueueItem {
    pub(crate) fn new(
        payload: Payload,
        priority: Priority,
        max_retries: u32,
        sequence: u64,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            payload,
            priority,
            enqueued_at: Instant::now(),
            sequence,
            retry_count: 0,
            max_retries,
        }
    }

    /// Whether another attempt may be scheduled after a failure.
    pub fn can_retry(&self) -> bool {
        self.max_retries > 0
    }

    /// Consume one unit of budget and produce the instance to re-enqueue.
    ///
    /// The new instance keeps identity and priority but gets a fresh
    /// timestamp and sequence when it is enqueued again.
    pub(crate) fn into_retry(mut self) -> Self {
        self.retry_count += 1;
        self.max_retries -= 1;
        self
    }

    pub(crate) fn restamp(&mut self, sequence: u64) {
        self.enqueued_at = Instant::now();
        self.sequence = sequence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Notification;

    fn item(max_retries: u32) -> QueueItem {
        QueueItem::new(
            Notification::info("t", "m").into(),
            Priority::Normal,
            max_retries,
            0,
        )
    }

    #[test]
    fn new_item_starts_without_retries() {
        let item = item(3);

        assert_eq!(item.retry_count, 0);
        assert_eq!(item.max_retries, 3);
        assert!(item.can_retry());
    }

    #[test]
    fn retry_moves_budget_into_count() {
        let original = item(2);
        let id = original.id;

        let first = original.into_retry();
        assert_eq!((first.retry_count, first.max_retries), (1, 1));
        assert!(first.can_retry());

        let second = first.into_retry();
        assert_eq!((second.retry_count, second.max_retries), (2, 0));
        assert!(!second.can_retry());
        assert_eq!(second.id, id);
    }

    #[test]
    fn zero_budget_cannot_retry() {
        assert!(!item(0).can_retry());
    }
}
