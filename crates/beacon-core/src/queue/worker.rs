//! Worker loop: pull from the dispatch channel, rate-limit, deliver, and
//! route failures to the retry scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::engine::Shared;
use super::{QueueItem, RetryDecision};
use crate::error::{DeliveryError, QueueError};
use crate::ports::deliver_payload;

/// Upper bound for a single delivery attempt.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) async fn run(worker_id: usize, shared: Arc<Shared>, shutdown: CancellationToken) {
    debug!(worker_id, "worker started");

    loop {
        // Shutdown wins over a ready item; whatever is left gets drained.
        let item = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            item = shared.recv() => item,
        };

        let Some(item) = item else {
            break;
        };

        process(worker_id, &shared, item).await;
    }

    debug!(worker_id, "worker stopped");
}

async fn process(worker_id: usize, shared: &Arc<Shared>, item: QueueItem) {
    shared.rate_limiter.acquire().await;

    // Once dequeued, an item runs to completion or to the attempt timeout;
    // shutdown does not interrupt it.
    let result = match timeout(
        DELIVERY_TIMEOUT,
        deliver_payload(shared.target.as_ref(), &item.payload),
    )
    .await
    {
        Ok(result) => result,
        Err(_elapsed) => Err(DeliveryError::TimedOut(DELIVERY_TIMEOUT)),
    };

    match result {
        Ok(()) => {
            shared.metrics.record_processed();
            debug!(
                worker_id,
                notification_id = %item.id,
                priority = %item.priority,
                retry_count = item.retry_count,
                "notification delivered"
            );
        }
        Err(err) => {
            warn!(
                worker_id,
                notification_id = %item.id,
                retry_count = item.retry_count,
                error = %err,
                "notification delivery failed"
            );
            handle_failure(shared, item);
        }
    }
}

fn handle_failure(shared: &Arc<Shared>, item: QueueItem) {
    match shared.retry_policy.decide(&item) {
        RetryDecision::Retry { delay } => schedule_retry(Arc::clone(shared), item.into_retry(), delay),
        RetryDecision::GiveUp => {
            shared.metrics.record_failed();
            warn!(
                notification_id = %item.id,
                retry_count = item.retry_count,
                "retries exhausted, giving up"
            );
        }
    }
}

/// Re-enqueue `item` after `delay` on a one-shot timer task.
///
/// The item is moved into the task, so its reduced budget travels with it.
/// A timer still pending when shutdown starts is abandoned and the item
/// counted as failed.
fn schedule_retry(shared: Arc<Shared>, item: QueueItem, delay: Duration) {
    debug!(
        notification_id = %item.id,
        retry_count = item.retry_count,
        remaining = item.max_retries,
        delay_ms = delay.as_millis() as u64,
        "retry scheduled"
    );

    // Already cancelled if shutdown began before this timer was armed.
    let shutdown = shared.shutdown.child_token();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                shared.metrics.record_failed();
                debug!(notification_id = %item.id, "retry abandoned by shutdown");
                return;
            }
            _ = sleep(delay) => {}
        }

        let id = item.id;
        match shared.requeue(item) {
            Ok(_) => {}
            // Capacity rejections are already counted as dropped.
            Err(QueueError::Full { .. }) => {}
            Err(err) => {
                shared.metrics.record_failed();
                debug!(notification_id = %id, error = %err, "retry could not be re-enqueued");
            }
        }
    });
}
