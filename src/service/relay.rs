//! Background task draining the notification bus.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::NotificationBus;
use crate::persistence::GamificationStore;

/// Spawns the relay loop.
///
/// Every notification is logged; when `log_store` is set it is also
/// appended to the store's notification log. Store failures are logged and
/// swallowed. The task ends when every bus sender is dropped.
#[must_use]
pub fn spawn_notification_relay(
    bus: &NotificationBus,
    log_store: Option<Arc<dyn GamificationStore>>,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => {
                    tracing::info!(
                        user_id = %notification.user_id(),
                        kind = notification.kind_str(),
                        "notification"
                    );
                    if let Some(store) = &log_store
                        && let Err(err) = store.append_notification(&notification).await
                    {
                        tracing::warn!(error = %err, "failed to log notification");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "notification relay lagged behind bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("notification relay stopped");
    })
}
