//! Impls: concrete delivery targets.
//!
//! - **NotifierSet**: fans one notification out to several targets
//! - **ConsoleTarget**: prints notifications to a terminal

pub mod console;
pub mod notifier_set;

pub use self::console::ConsoleTarget;
pub use self::notifier_set::{DEFAULT_MAX_OUTPUT_LENGTH, NotifierSet};
