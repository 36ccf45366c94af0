use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use beacon_core::impls::{ConsoleTarget, NotifierSet};
use beacon_core::{
    DeliveryError, DeliveryTarget, MetricsSnapshot, Notification, NotificationQueue,
    OutputNotification, Priority, QueueOptions,
};

/// Console target that fails every `every`-th delivery, so the demo shows
/// the retry path.
struct Flaky {
    inner: ConsoleTarget,
    every: u32,
    calls: AtomicU32,
}

impl Flaky {
    fn check(&self) -> Result<(), DeliveryError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.every > 0 && call % self.every == 0 {
            return Err(DeliveryError::failed(format!("simulated failure on call {call}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryTarget for Flaky {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.check()?;
        self.inner.deliver(notification).await
    }

    async fn deliver_with_output(
        &self,
        notification: &OutputNotification,
    ) -> Result<(), DeliveryError> {
        self.check()?;
        self.inner.deliver_with_output(notification).await
    }

    fn supports_output(&self) -> bool {
        true
    }
}

#[derive(Debug, Serialize)]
struct Report {
    options: QueueOptions,
    enqueued: usize,
    rejected: usize,
    metrics: MetricsSnapshot,
}

fn burst() -> Vec<(Notification, Priority)> {
    let mut out = Vec::new();
    for round in 0..3 {
        for priority in Priority::ALL {
            let n = match priority {
                Priority::Low => Notification::info(format!("Tick {round}"), "background sync"),
                Priority::Normal => Notification::success(format!("Build {round}"), "finished"),
                Priority::High => Notification::warning(format!("Disk {round}"), "almost full"),
                Priority::Critical => Notification::error(format!("Deploy {round}"), "rolled back"),
            };
            out.push((n, priority));
        }
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "beacon_core=info,beacon_cli=info".into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    // Logs share stderr with the console target; the report goes to stdout.
    if std::env::var("BEACON_LOG_JSON").is_ok_and(|v| v == "1") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let options = QueueOptions::from_env()?;
    let stop_after = Duration::from_millis(
        std::env::var("BEACON_DEMO_STOP_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2000),
    );

    let mut targets = NotifierSet::new();
    targets.add(Arc::new(Flaky {
        inner: ConsoleTarget::stderr(),
        every: 5,
        calls: AtomicU32::new(0),
    }));

    let queue = NotificationQueue::new(Arc::new(targets), options);
    queue.start()?;
    tracing::info!("beacon demo started");

    let mut enqueued = 0;
    let mut rejected = 0;
    for (n, priority) in burst() {
        match queue.enqueue(n, priority) {
            Ok(_) => enqueued += 1,
            Err(err) => {
                rejected += 1;
                tracing::warn!(error = %err, "enqueue rejected");
            }
        }
    }

    let output = OutputNotification::new(
        Notification::error("cargo test", "2 tests failed"),
        "test queue::drain ... FAILED\ntest queue::retry ... FAILED",
        101,
    );
    match queue.enqueue(output, Priority::High) {
        Ok(_) => enqueued += 1,
        Err(err) => {
            rejected += 1;
            tracing::warn!(error = %err, "enqueue rejected");
        }
    }

    tokio::select! {
        _ = tokio::time::sleep(stop_after) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal, stopping");
        }
    }

    if let Err(err) = queue.stop(Duration::from_secs(5)).await {
        tracing::error!(error = %err, "queue did not stop cleanly");
    }

    let report = Report {
        options: queue.options().clone(),
        enqueued,
        rejected,
        metrics: queue.metrics(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
