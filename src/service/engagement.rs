//! Batched engagement counters.
//!
//! Counting every event with a database write would double the write load
//! of the hottest paths. [`EngagementTracker`] keeps per-user deltas in
//! memory and writes a user's delta once it holds `flush_every` events.
//! Unflushed deltas are lost on crash.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::{GamificationEvent, UserId};
use crate::persistence::{EngagementCounters, GamificationStore};

/// Cache-then-flush counter buffer.
#[derive(Debug)]
pub struct EngagementTracker {
    store: Arc<dyn GamificationStore>,
    pending: Mutex<HashMap<UserId, EngagementCounters>>,
    flush_every: u64,
}

impl EngagementTracker {
    /// Creates a tracker that flushes a user after `flush_every` events.
    #[must_use]
    pub fn new(store: Arc<dyn GamificationStore>, flush_every: u64) -> Self {
        Self {
            store,
            pending: Mutex::new(HashMap::new()),
            flush_every: flush_every.max(1),
        }
    }

    /// Counts an event. Returns `true` if the user's delta was flushed.
    ///
    /// A failed flush is logged and the delta goes back into the buffer.
    pub async fn record(&self, user_id: UserId, event: GamificationEvent) -> bool {
        let due = {
            let mut pending = self.pending.lock().await;
            let counters = pending
                .entry(user_id)
                .or_insert_with(|| EngagementCounters::new(user_id));
            counters.record(event);
            if counters.events_total >= self.flush_every {
                pending.remove(&user_id)
            } else {
                None
            }
        };

        match due {
            Some(delta) => self.write(delta).await,
            None => false,
        }
    }

    /// Flushes every pending delta. Returns how many users were written.
    pub async fn flush_all(&self) -> usize {
        let drained: Vec<EngagementCounters> = {
            let mut pending = self.pending.lock().await;
            pending.drain().map(|(_, counters)| counters).collect()
        };

        let mut written = 0;
        for delta in drained {
            if self.write(delta).await {
                written += 1;
            }
        }
        tracing::debug!(written, "engagement counters flushed");
        written
    }

    /// Unflushed delta of a user.
    pub async fn pending_for(&self, user_id: UserId) -> Option<EngagementCounters> {
        self.pending.lock().await.get(&user_id).cloned()
    }

    async fn write(&self, mut delta: EngagementCounters) -> bool {
        delta.last_flushed_at = Some(Utc::now());
        match self.store.add_engagement(&delta).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(user_id = %delta.user_id, error = %err, "engagement flush failed");
                delta.last_flushed_at = None;
                let mut pending = self.pending.lock().await;
                pending
                    .entry(delta.user_id)
                    .or_insert_with(|| EngagementCounters::new(delta.user_id))
                    .merge(&delta);
                false
            }
        }
    }
}
