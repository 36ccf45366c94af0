//! Priority store: the waiting room for items that missed the fast path.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::QueueItem;

/// Heap entry ordering items by (priority desc, enqueued_at asc, sequence asc).
///
/// `BinaryHeap` is a max-heap, so "greater" means "dispatch first".
#[derive(Debug)]
struct StoredItem(QueueItem);

impl PartialEq for StoredItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StoredItem {}

impl PartialOrd for StoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .priority
            .cmp(&other.0.priority)
            // Earlier timestamps win, so compare reversed.
            .then_with(|| other.0.enqueued_at.cmp(&self.0.enqueued_at))
            .then_with(|| other.0.sequence.cmp(&self.0.sequence))
    }
}

/// Binary heap of waiting items. Push and pop are O(log n).
#[derive(Debug, Default)]
pub struct PriorityStore {
    heap: BinaryHeap<StoredItem>,
}

impl PriorityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: QueueItem) {
        self.heap.push(StoredItem(item));
    }

    /// Remove the most urgent item; `None` when empty.
    pub fn pop(&mut self) -> Option<QueueItem> {
        self.heap.pop().map(|entry| entry.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Empty the store, returning items in dispatch order.
    pub fn drain_ordered(&mut self) -> Vec<QueueItem> {
        let mut items = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.pop() {
            items.push(item);
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;

    use super::*;
    use crate::domain::{Notification, Priority};

    fn item(title: &str, priority: Priority, sequence: u64) -> QueueItem {
        QueueItem::new(Notification::info(title, "").into(), priority, 3, sequence)
    }

    fn titles(items: &[QueueItem]) -> Vec<&str> {
        items.iter().map(|i| i.payload.title()).collect()
    }

    #[test]
    fn pop_on_empty_store_is_none() {
        let mut store = PriorityStore::new();

        assert!(store.pop().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn higher_priority_pops_first() {
        let mut store = PriorityStore::new();
        store.push(item("low", Priority::Low, 0));
        store.push(item("critical", Priority::Critical, 1));
        store.push(item("normal", Priority::Normal, 2));
        store.push(item("high", Priority::High, 3));

        assert_eq!(store.len(), 4);
        assert_eq!(
            titles(&store.drain_ordered()),
            vec!["critical", "high", "normal", "low"]
        );
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_timestamp_wins_within_a_tier() {
        let mut store = PriorityStore::new();
        let first = item("first", Priority::High, 9);
        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        let second = item("second", Priority::High, 1);

        store.push(second);
        store.push(first);

        assert_eq!(titles(&store.drain_ordered()), vec!["first", "second"]);
    }

    #[test]
    fn same_instant_falls_back_to_sequence() {
        let mut store = PriorityStore::new();
        let mut a = item("a", Priority::Normal, 0);
        let mut b = item("b", Priority::Normal, 1);
        let now = tokio::time::Instant::now();
        a.enqueued_at = now;
        b.enqueued_at = now;

        store.push(b);
        store.push(a);

        assert_eq!(titles(&store.drain_ordered()), vec!["a", "b"]);
    }

    #[test]
    fn shuffled_input_comes_out_sorted() {
        let now = tokio::time::Instant::now();
        let mut items: Vec<QueueItem> = (0..200u64)
            .map(|seq| {
                let priority = Priority::ALL[(seq % 4) as usize];
                let mut it = item(&seq.to_string(), priority, seq);
                it.enqueued_at = now;
                it
            })
            .collect();
        items.shuffle(&mut rand::thread_rng());

        let mut store = PriorityStore::new();
        for it in items {
            store.push(it);
        }
        let out = store.drain_ordered();

        for pair in out.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.priority > b.priority || (a.priority == b.priority && a.sequence < b.sequence),
                "out of order: {:?}/{} before {:?}/{}",
                a.priority,
                a.sequence,
                b.priority,
                b.sequence
            );
        }
    }
}
