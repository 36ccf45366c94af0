//! Queue module: priority store, dispatcher, workers, retry and rate limiting.
//!
//! Data flow:
//! producer -> enqueue -> (dispatch channel if it has room, else priority
//! store) -> dispatcher promotes stored items as room frees -> worker ->
//! rate limiter -> delivery target -> processed, or retry / failed.

mod dispatcher;
mod engine;
mod item;
mod metrics;
mod options;
mod rate_limit;
mod retry;
mod state;
mod store;
mod worker;

pub use dispatcher::{DISPATCH_TICK, DRAIN_TIMEOUT};
pub use engine::NotificationQueue;
pub use item::QueueItem;
pub use metrics::MetricsSnapshot;
pub use options::QueueOptions;
pub use rate_limit::RateLimiter;
pub use retry::{RetryDecision, RetryPolicy};
pub use state::LifecycleState;
pub use store::PriorityStore;
pub use worker::DELIVERY_TIMEOUT;
