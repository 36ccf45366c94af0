//! NotifierSet - fan-out over several delivery targets.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Notification, OutputNotification};
use crate::error::DeliveryError;
use crate::ports::DeliveryTarget;

pub const DEFAULT_MAX_OUTPUT_LENGTH: usize = 1024;

/// Delivers every notification to all registered targets.
///
/// Unavailable targets are skipped at registration. Delivery attempts every
/// target even if some fail and reports the last error seen.
pub struct NotifierSet {
    targets: Vec<Arc<dyn DeliveryTarget>>,
    max_output_length: usize,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            max_output_length: DEFAULT_MAX_OUTPUT_LENGTH,
        }
    }

    pub fn with_max_output_length(mut self, max_output_length: usize) -> Self {
        if max_output_length > 0 {
            self.max_output_length = max_output_length;
        }
        self
    }

    /// Register a target. Returns whether it was accepted.
    pub fn add(&mut self, target: Arc<dyn DeliveryTarget>) -> bool {
        if !target.is_available() {
            return false;
        }
        self.targets.push(target);
        true
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn max_output_length(&self) -> usize {
        self.max_output_length
    }

    /// Targets able to render command output themselves.
    pub fn output_targets(&self) -> impl Iterator<Item = &Arc<dyn DeliveryTarget>> {
        self.targets.iter().filter(|t| t.supports_output())
    }

    fn ensure_targets(&self) -> Result<(), DeliveryError> {
        if self.targets.is_empty() {
            return Err(DeliveryError::Unavailable(
                "no delivery targets registered".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for NotifierSet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryTarget for NotifierSet {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.ensure_targets()?;
        let mut last_error = None;
        for target in &self.targets {
            if let Err(err) = target.deliver(notification).await {
                last_error = Some(err);
            }
        }
        last_error.map_or(Ok(()), Err)
    }

    async fn deliver_with_output(
        &self,
        notification: &OutputNotification,
    ) -> Result<(), DeliveryError> {
        self.ensure_targets()?;
        let notification = notification.clone().truncated(self.max_output_length);
        let plain = notification.to_plain();

        let mut last_error = None;
        for target in &self.targets {
            let result = if target.supports_output() {
                target.deliver_with_output(&notification).await
            } else {
                target.deliver(&plain).await
            };
            if let Err(err) = result {
                last_error = Some(err);
            }
        }
        last_error.map_or(Ok(()), Err)
    }

    fn is_available(&self) -> bool {
        !self.targets.is_empty()
    }

    fn supports_output(&self) -> bool {
        self.output_targets().next().is_some()
    }
}
