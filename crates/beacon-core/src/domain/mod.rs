//! Domain model: what gets queued and how urgent it is.

pub mod ids;
pub mod notification;
pub mod priority;

pub use ids::NotificationId;
pub use notification::{Level, Notification, OutputNotification, Payload};
pub use priority::Priority;
