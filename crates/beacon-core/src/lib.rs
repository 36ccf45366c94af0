//! beacon-core
//!
//! Asynchronous notification delivery queue.
//!
//! Producers hand notifications to a [`NotificationQueue`]; a dispatcher and
//! a pool of workers deliver them through a [`DeliveryTarget`] with priority
//! ordering under contention, a shared rate limit, linear retry backoff and
//! a drain on shutdown.
//!
//! # Modules
//! - **domain**: notification payloads, priorities, ids
//! - **ports**: the `DeliveryTarget` boundary
//! - **impls**: fan-out and console delivery targets
//! - **queue**: the delivery engine
//! - **error**: error types

pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use domain::{Level, Notification, NotificationId, OutputNotification, Payload, Priority};
pub use error::{ConfigError, DeliveryError, QueueError};
pub use ports::DeliveryTarget;
pub use queue::{LifecycleState, MetricsSnapshot, NotificationQueue, QueueOptions};
