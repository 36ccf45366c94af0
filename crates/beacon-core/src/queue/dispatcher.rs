//! Dispatcher loop: promotes stored items into the dispatch channel, and
//! drains the queue on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::engine::Shared;
use crate::ports::deliver_payload;

/// How often the store is checked for items that fit into the channel.
pub const DISPATCH_TICK: Duration = Duration::from_millis(10);

/// Overall budget for delivering everything left at shutdown.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) async fn run(shared: Arc<Shared>, shutdown: CancellationToken) {
    let mut ticker = interval(DISPATCH_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let moved = shared.promote();
                if moved > 0 {
                    debug!(moved, "promoted stored notifications");
                }
            }
        }
    }

    drain(&shared).await;
}

/// Deliver every item still queued, once each, ignoring the rate limit and
/// the retry budget. Every drained item counts as processed whatever the
/// outcome, so nothing is counted twice.
pub(crate) async fn drain(shared: &Shared) {
    let items = shared.take_all().await;
    if items.is_empty() {
        return;
    }

    let total = items.len();
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    let mut failures = 0usize;

    for item in items {
        let delivered = matches!(
            timeout_at(deadline, deliver_payload(shared.target.as_ref(), &item.payload)).await,
            Ok(Ok(()))
        );
        if !delivered {
            failures += 1;
            debug!(notification_id = %item.id, "drain delivery failed");
        }
        shared.metrics.record_processed();
    }

    info!(total, failures, "drained remaining notifications");
}
