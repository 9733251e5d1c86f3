//! Broadcast channel for user notifications.
//!
//! [`NotificationBus`] wraps a [`tokio::sync::broadcast`] channel. Engine
//! operations publish without waiting on delivery; the host application and
//! the notification relay subscribe.

use tokio::sync::broadcast;

use super::Notification;

/// Broadcast bus for [`Notification`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest notifications
/// are dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Creates a new `NotificationBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a notification to all subscribers.
    ///
    /// Returns the number of receivers that got it. A notification nobody
    /// listens to is dropped and logged; publishing never fails the caller.
    pub fn publish(&self, notification: Notification) -> usize {
        let kind = notification.kind_str();
        let user_id = notification.user_id();
        match self.sender.send(notification) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(%user_id, kind, "notification dropped: no subscribers");
                0
            }
        }
    }

    /// Creates a new receiver that will receive all future notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(10_000)
    }
}
