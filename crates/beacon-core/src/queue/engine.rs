//! NotificationQueue: the aggregate that owns the store, the dispatch channel
//! and the background tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::metrics::QueueMetrics;
use super::{
    LifecycleState, MetricsSnapshot, PriorityStore, QueueItem, QueueOptions, RateLimiter,
    RetryPolicy, dispatcher, worker,
};
use crate::domain::{NotificationId, Payload, Priority};
use crate::error::QueueError;
use crate::ports::DeliveryTarget;

/// Which way an accepted item went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Straight into the dispatch channel.
    FastPath,
    /// Parked in the priority store until the dispatcher promotes it.
    Stored,
}

/// Everything guarded by the bookkeeping mutex.
#[derive(Debug)]
struct Bookkeeping {
    store: PriorityStore,
    state: LifecycleState,
}

/// State shared between the handle, the dispatcher, the workers and retry
/// timers.
pub(crate) struct Shared {
    pub(crate) options: QueueOptions,
    pub(crate) target: Arc<dyn DeliveryTarget>,
    pub(crate) metrics: QueueMetrics,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) retry_policy: RetryPolicy,
    /// Cancelled once when `stop` begins.
    pub(crate) shutdown: CancellationToken,

    book: Mutex<Bookkeeping>,
    tx: mpsc::Sender<QueueItem>,
    rx: tokio::sync::Mutex<mpsc::Receiver<QueueItem>>,
    next_sequence: AtomicU64,
}

impl Shared {
    fn book(&self) -> MutexGuard<'_, Bookkeeping> {
        // The guarded data stays consistent even if a holder panicked.
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn channel_len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.book().state
    }

    /// Occupancy of store + channel.
    pub(crate) fn size(&self) -> usize {
        let book = self.book();
        book.store.len() + self.channel_len()
    }

    /// Capacity check, then fast path, then store.
    ///
    /// The channel length is read under the bookkeeping lock but workers
    /// receive without it, so the check is advisory: concurrent producers
    /// can overshoot `max_queue_size` by a small margin.
    pub(crate) fn admit(&self, item: QueueItem) -> Result<Admission, QueueError> {
        let mut book = self.book();
        if !book.state.accepts_enqueue() {
            return Err(QueueError::Closed(book.state));
        }

        let capacity = self.options.max_queue_size;
        let current = book.store.len() + self.channel_len();
        if current >= capacity {
            self.metrics.record_dropped();
            warn!(
                notification_id = %item.id,
                priority = %item.priority,
                capacity,
                "queue full, dropping notification"
            );
            return Err(QueueError::Full { capacity });
        }

        match self.tx.try_send(item) {
            Ok(()) => Ok(Admission::FastPath),
            Err(TrySendError::Full(item)) | Err(TrySendError::Closed(item)) => {
                book.store.push(item);
                Ok(Admission::Stored)
            }
        }
    }

    /// Re-admit an item whose retry timer fired.
    pub(crate) fn requeue(&self, mut item: QueueItem) -> Result<Admission, QueueError> {
        item.restamp(self.next_sequence());
        self.admit(item)
    }

    /// Move as many stored items into the channel as it has room for,
    /// most urgent first. Returns how many moved.
    pub(crate) fn promote(&self) -> usize {
        let mut book = self.book();
        let mut moved = 0;
        while let Some(item) = book.store.pop() {
            match self.tx.try_send(item) {
                Ok(()) => moved += 1,
                Err(TrySendError::Full(item)) | Err(TrySendError::Closed(item)) => {
                    // Put it back and stop; never skip ahead of it.
                    book.store.push(item);
                    break;
                }
            }
        }
        moved
    }

    /// Wait for the next item in the dispatch channel.
    pub(crate) async fn recv(&self) -> Option<QueueItem> {
        self.rx.lock().await.recv().await
    }

    /// Remove everything still queued: channel contents first (they were
    /// admitted ahead of anything in the store), then the store in priority
    /// order.
    pub(crate) async fn take_all(&self) -> Vec<QueueItem> {
        let mut items = Vec::new();
        {
            let mut rx = self.rx.lock().await;
            while let Ok(item) = rx.try_recv() {
                items.push(item);
            }
        }
        items.extend(self.book().store.drain_ordered());
        items
    }
}

/// Bounded, priority-aware, retrying notification delivery queue.
///
/// # Example
/// ```ignore
/// let queue = NotificationQueue::new(Arc::new(ConsoleTarget::stderr()), QueueOptions::default());
/// queue.start()?;
/// queue.enqueue(Notification::info("Build", "finished"), Priority::Normal)?;
/// queue.stop(Duration::from_secs(5)).await?;
/// println!("{:?}", queue.metrics());
/// ```
pub struct NotificationQueue {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationQueue {
    pub fn new(target: Arc<dyn DeliveryTarget>, options: QueueOptions) -> Self {
        let options = options.normalized();
        let (tx, rx) = mpsc::channel(options.channel_capacity());

        let shared = Shared {
            rate_limiter: RateLimiter::new(options.rate_limit),
            retry_policy: RetryPolicy::new(options.retry_backoff),
            options,
            target,
            metrics: QueueMetrics::default(),
            shutdown: CancellationToken::new(),
            book: Mutex::new(Bookkeeping {
                store: PriorityStore::new(),
                state: LifecycleState::Created,
            }),
            tx,
            rx: tokio::sync::Mutex::new(rx),
            next_sequence: AtomicU64::new(0),
        };

        Self {
            shared: Arc::new(shared),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &QueueOptions {
        &self.shared.options
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Spawn the dispatcher and the workers on the current tokio runtime.
    pub fn start(&self) -> Result<(), QueueError> {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        {
            let mut book = self.shared.book();
            if book.state != LifecycleState::Created {
                return Err(QueueError::InvalidState {
                    action: "start",
                    state: book.state,
                });
            }
            book.state = LifecycleState::Running;
        }

        let workers = self.shared.options.workers;
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.reserve(workers + 1);

        tasks.push(runtime.spawn(dispatcher::run(
            Arc::clone(&self.shared),
            self.shared.shutdown.child_token(),
        )));
        for worker_id in 0..workers {
            tasks.push(runtime.spawn(worker::run(
                worker_id,
                Arc::clone(&self.shared),
                self.shared.shutdown.child_token(),
            )));
        }

        info!(
            workers,
            max_queue_size = self.shared.options.max_queue_size,
            rate_limit_ms = self.shared.rate_limiter.interval().as_millis() as u64,
            "notification queue started"
        );
        Ok(())
    }

    /// Enqueue with the default retry budget.
    pub fn enqueue(
        &self,
        payload: impl Into<Payload>,
        priority: Priority,
    ) -> Result<NotificationId, QueueError> {
        self.enqueue_with_retries(payload, priority, self.shared.options.max_retries)
    }

    /// Enqueue with an explicit retry budget. Never blocks.
    ///
    /// Only capacity and lifecycle rejections are reported here; delivery
    /// outcomes show up in [`NotificationQueue::metrics`].
    pub fn enqueue_with_retries(
        &self,
        payload: impl Into<Payload>,
        priority: Priority,
        max_retries: u32,
    ) -> Result<NotificationId, QueueError> {
        let item = QueueItem::new(
            payload.into(),
            priority,
            max_retries,
            self.shared.next_sequence(),
        );
        let id = item.id;
        let admission = self.shared.admit(item)?;
        debug!(notification_id = %id, %priority, ?admission, "notification enqueued");
        Ok(id)
    }

    /// Signal shutdown, drain what is still queued and wait for every
    /// background task, all within `deadline`.
    ///
    /// On timeout the tasks are left running; in-flight deliveries are never
    /// interrupted. The queue then stays in `Draining`.
    pub async fn stop(&self, deadline: Duration) -> Result<(), QueueError> {
        let previous = {
            let mut book = self.shared.book();
            if !book.state.can_stop() {
                return Err(QueueError::InvalidState {
                    action: "stop",
                    state: book.state,
                });
            }
            let previous = book.state;
            book.state = LifecycleState::Draining;
            previous
        };

        info!(
            deadline_ms = deadline.as_millis() as u64,
            queued = self.shared.size(),
            "stopping notification queue"
        );
        self.shared.shutdown.cancel();

        let handles =
            std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let shared = Arc::clone(&self.shared);
        let shutdown = async move {
            if previous == LifecycleState::Created {
                // Never started, so no dispatcher exists to drain for us.
                dispatcher::drain(&shared).await;
            }
            for handle in handles {
                if let Err(err) = handle.await {
                    error!(error = %err, "queue task panicked during shutdown");
                }
            }
        };

        match tokio::time::timeout(deadline, shutdown).await {
            Ok(()) => {
                self.shared.book().state = LifecycleState::Stopped;
                info!(metrics = ?self.metrics(), "notification queue stopped");
                Ok(())
            }
            Err(_elapsed) => {
                warn!(
                    deadline_ms = deadline.as_millis() as u64,
                    "queue shutdown timed out, tasks left running"
                );
                Err(QueueError::ShutdownTimeout(deadline))
            }
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Current store + channel occupancy. Advisory only.
    pub fn queue_size(&self) -> usize {
        self.shared.size()
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        if !self.shared.shutdown.is_cancelled() {
            if self.state() == LifecycleState::Running {
                warn!("notification queue dropped while running, cancelling background tasks");
            }
            self.shared.shutdown.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::Notification;
    use crate::error::DeliveryError;

    struct NoopTarget;

    #[async_trait]
    impl DeliveryTarget for NoopTarget {
        async fn deliver(&self, _notification: &Notification) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn queue(max: usize, dispatch: usize) -> NotificationQueue {
        NotificationQueue::new(
            Arc::new(NoopTarget),
            QueueOptions {
                max_queue_size: max,
                dispatch_capacity: Some(dispatch),
                ..QueueOptions::default()
            },
        )
    }

    #[test]
    fn admission_prefers_channel_then_store() {
        let q = queue(10, 2);
        let admit = |p| {
            q.shared
                .admit(QueueItem::new(Notification::info("t", "").into(), p, 0, 0))
                .unwrap()
        };

        assert_eq!(admit(Priority::Low), Admission::FastPath);
        assert_eq!(admit(Priority::Low), Admission::FastPath);
        assert_eq!(admit(Priority::Critical), Admission::Stored);
        assert_eq!(q.queue_size(), 3);
    }

    #[test]
    fn full_queue_rejects_and_counts_drop() {
        let q = queue(3, 1);
        for _ in 0..3 {
            q.enqueue(Notification::info("t", ""), Priority::Normal).unwrap();
        }

        let err = q
            .enqueue(Notification::info("t", ""), Priority::Critical)
            .unwrap_err();

        assert!(matches!(err, QueueError::Full { capacity: 3 }));
        assert_eq!(q.metrics().dropped, 1);
        assert_eq!(q.queue_size(), 3);
    }

    #[tokio::test]
    async fn promote_moves_most_urgent_first_and_stops_when_full() {
        let q = queue(10, 1);
        q.enqueue(Notification::info("filler", ""), Priority::Low).unwrap();
        q.enqueue(Notification::info("normal", ""), Priority::Normal).unwrap();
        q.enqueue(Notification::info("critical", ""), Priority::Critical).unwrap();

        // Channel is full: nothing can move.
        assert_eq!(q.shared.promote(), 0);

        let first = q.shared.recv().await.unwrap();
        assert_eq!(first.payload.title(), "filler");

        assert_eq!(q.shared.promote(), 1);
        let next = q.shared.recv().await.unwrap();
        assert_eq!(next.payload.title(), "critical");
    }

    #[tokio::test]
    async fn take_all_returns_channel_then_store_in_priority_order() {
        let q = queue(10, 1);
        q.enqueue(Notification::info("channel", ""), Priority::Low).unwrap();
        q.enqueue(Notification::info("high", ""), Priority::High).unwrap();
        q.enqueue(Notification::info("critical", ""), Priority::Critical).unwrap();

        let titles: Vec<String> = q
            .shared
            .take_all()
            .await
            .iter()
            .map(|i| i.payload.title().to_string())
            .collect();

        assert_eq!(titles, vec!["channel", "critical", "high"]);
        assert_eq!(q.queue_size(), 0);
    }

    #[test]
    fn start_outside_runtime_is_rejected() {
        let q = queue(10, 10);

        let err = q.start().unwrap_err();

        assert!(matches!(err, QueueError::NoRuntime));
        assert_eq!(q.state(), LifecycleState::Created);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let q = queue(10, 10);
        q.start().unwrap();

        let err = q.start().unwrap_err();

        assert!(matches!(
            err,
            QueueError::InvalidState {
                action: "start",
                state: LifecycleState::Running
            }
        ));
        q.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn enqueue_after_stop_is_closed() {
        let q = queue(10, 10);
        q.start().unwrap();
        q.stop(Duration::from_secs(1)).await.unwrap();

        let err = q
            .enqueue(Notification::info("late", ""), Priority::High)
            .unwrap_err();

        assert!(matches!(err, QueueError::Closed(LifecycleState::Stopped)));
        assert_eq!(q.metrics().dropped, 0);
    }

    #[tokio::test]
    async fn stop_without_start_drains_inline() {
        let q = queue(10, 2);
        for _ in 0..4 {
            q.enqueue(Notification::info("t", ""), Priority::Normal).unwrap();
        }

        q.stop(Duration::from_secs(1)).await.unwrap();

        assert_eq!(q.state(), LifecycleState::Stopped);
        assert_eq!(q.metrics().processed, 4);
        assert_eq!(q.queue_size(), 0);
    }

    #[tokio::test]
    async fn stop_twice_is_rejected() {
        let q = queue(10, 10);
        q.stop(Duration::from_secs(1)).await.unwrap();

        let err = q.stop(Duration::from_secs(1)).await.unwrap_err();

        assert!(matches!(
            err,
            QueueError::InvalidState {
                action: "stop",
                ..
            }
        ));
    }
}
