//! Notification identifiers.
//!
//! IDs are ULIDs so log lines sort by creation time. They exist purely for
//! correlating log output across retries of the same notification.

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(Ulid);

impl NotificationId {
    /// Generate a fresh id stamped with the current wall-clock time.
    pub fn generate() -> Self {
        let timestamp_ms = chrono::Utc::now().timestamp_millis() as u64;
        Self(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ntf-{}", self.0)
    }
}
