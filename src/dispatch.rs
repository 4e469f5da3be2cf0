//! Notification channels provided by the facade.

use async_trait::async_trait;

use fintrack_core::{DispatchError, Notification, NotificationDispatcher};

/// Emits every notification as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        tracing::info!(
            target: "fintrack::notifications",
            recipient = %notification.recipient,
            subject = %notification.subject,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}

/// Drops every notification. Used when notifications are switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutedDispatcher;

#[async_trait]
impl NotificationDispatcher for MutedDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        tracing::debug!(subject = %notification.subject, "notifications disabled; message dropped");
        Ok(())
    }
}
