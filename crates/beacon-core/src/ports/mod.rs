//! Ports: the boundary between the queue and the outside world.
//!
//! The queue depends on exactly one collaborator, the delivery target that
//! actually shows a notification to the user.

pub mod delivery_target;

pub use self::delivery_target::{DeliveryTarget, deliver_payload};
