//! DeliveryTarget port.

use async_trait::async_trait;

use crate::domain::{Notification, OutputNotification, Payload};
use crate::error::DeliveryError;

/// Something that can show a notification to the user.
///
/// Implementations may be slow and may fail; the queue bounds each call
/// with a timeout and retries failures without looking at the error.
#[async_trait]
pub trait DeliveryTarget: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;

    /// Show a notification with captured command output.
    ///
    /// Targets without rich output fall back to a plain notification with
    /// the output folded into the message.
    async fn deliver_with_output(
        &self,
        notification: &OutputNotification,
    ) -> Result<(), DeliveryError> {
        self.deliver(&notification.to_plain()).await
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supports_output(&self) -> bool {
        false
    }
}

/// Route a payload to the matching delivery call.
pub async fn deliver_payload(
    target: &dyn DeliveryTarget,
    payload: &Payload,
) -> Result<(), DeliveryError> {
    match payload {
        Payload::Plain(notification) => target.deliver(notification).await,
        Payload::WithOutput(notification) => target.deliver_with_output(notification).await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct PlainOnly {
        seen: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl DeliveryTarget for PlainOnly {
        async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
            self.seen.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn output_payload_falls_back_to_plain_delivery() {
        let target = PlainOnly::default();
        let payload = Payload::from(OutputNotification::new(
            Notification::info("Test Command", "Command completed"),
            "Some output",
            0,
        ));

        deliver_payload(&target, &payload).await.unwrap();

        let seen = target.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].message.contains("Some output"));
    }

    #[tokio::test]
    async fn plain_payload_is_delivered_as_is() {
        let target = PlainOnly::default();
        let notification = Notification::success("Done", "ok");

        deliver_payload(&target, &Payload::from(notification.clone()))
            .await
            .unwrap();

        assert_eq!(target.seen.lock().unwrap()[0], notification);
    }
}
