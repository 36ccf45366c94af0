//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;
pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Immutable queue configuration.
///
/// Durations are (de)serialized as integer milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    /// Maximum items held at once (priority store + dispatch channel).
    pub max_queue_size: usize,

    /// Number of worker tasks.
    pub workers: usize,

    /// Capacity of the dispatch channel. `None` means `max_queue_size`.
    pub dispatch_capacity: Option<usize>,

    /// Minimum time between two delivery starts, across all workers.
    #[serde(with = "duration_ms")]
    pub rate_limit: Duration,

    /// Base delay for linear retry backoff.
    #[serde(with = "duration_ms")]
    pub retry_backoff: Duration,

    /// Retries allowed per notification (total attempts = max_retries + 1).
    pub max_retries: u32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            workers: DEFAULT_WORKERS,
            dispatch_capacity: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl QueueOptions {
    /// Replace zero sizes and durations with defaults and clamp the dispatch
    /// capacity to the total capacity.
    pub fn normalized(mut self) -> Self {
        if self.max_queue_size == 0 {
            self.max_queue_size = DEFAULT_MAX_QUEUE_SIZE;
        }
        if self.workers == 0 {
            self.workers = DEFAULT_WORKERS;
        }
        if self.rate_limit.is_zero() {
            self.rate_limit = DEFAULT_RATE_LIMIT;
        }
        if self.retry_backoff.is_zero() {
            self.retry_backoff = DEFAULT_RETRY_BACKOFF;
        }
        let capacity = match self.dispatch_capacity {
            Some(0) | None => self.max_queue_size,
            Some(n) => n.min(self.max_queue_size),
        };
        self.dispatch_capacity = Some(capacity);
        self
    }

    /// Effective dispatch channel capacity.
    pub fn channel_capacity(&self) -> usize {
        match self.dispatch_capacity {
            Some(0) | None => self.max_queue_size.max(1),
            Some(n) => n.min(self.max_queue_size).max(1),
        }
    }

    /// Load options from `BEACON_QUEUE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary key lookup. Missing keys keep their
    /// defaults; present keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            max_queue_size: parse_or(&lookup, "BEACON_QUEUE_MAX_SIZE", defaults.max_queue_size)?,
            workers: parse_or(&lookup, "BEACON_QUEUE_WORKERS", defaults.workers)?,
            dispatch_capacity: match lookup("BEACON_QUEUE_DISPATCH_CAPACITY") {
                Some(raw) => Some(parse("BEACON_QUEUE_DISPATCH_CAPACITY", &raw)?),
                None => defaults.dispatch_capacity,
            },
            rate_limit: Duration::from_millis(parse_or(
                &lookup,
                "BEACON_QUEUE_RATE_LIMIT_MS",
                defaults.rate_limit.as_millis() as u64,
            )?),
            retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "BEACON_QUEUE_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )?),
            max_retries: parse_or(&lookup, "BEACON_QUEUE_MAX_RETRIES", defaults.max_retries)?,
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        expected: std::any::type_name::<T>(),
        value: raw.to_string(),
    })
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
