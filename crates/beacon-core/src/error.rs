use std::time::Duration;

use thiserror::Error;

use crate::queue::LifecycleState;

/// Errors surfaced by the queue's public operations.
///
/// Delivery failures never show up here: they are absorbed by the retry
/// machinery and only observable through the metrics snapshot.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is full ({capacity} items)")]
    Full { capacity: usize },

    #[error("queue is not accepting notifications (state={0})")]
    Closed(LifecycleState),

    #[error("cannot {action} a queue in state {state}")]
    InvalidState {
        action: &'static str,
        state: LifecycleState,
    },

    #[error("cannot start a queue outside a tokio runtime")]
    NoRuntime,

    #[error("queue shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Failure reported by a delivery target.
///
/// The queue treats every variant the same way (a failed attempt); the
/// variants exist for the targets' own logging.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery failed: {0}")]
    Failed(String),

    #[error("delivery timed out after {0:?}")]
    TimedOut(Duration),

    #[error("delivery target unavailable: {0}")]
    Unavailable(String),

    #[error("i/o error while delivering: {0}")]
    Io(#[from] std::io::Error),
}

impl DeliveryError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a valid {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}
