// Regeneration tracking
//
// Guarantees at most one in-flight background regeneration per cache key.
// - First stale read for a key (owner): gets a guard and runs the render
// - Stale reads while the owner runs: get nothing and serve stale content
//   without waiting
// - Guard drop (success, failure or panic): removes the key and wakes
//   anyone waiting in `wait()`

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Tracks in-flight regenerations by cache key
#[derive(Debug, Clone, Default)]
pub struct RegenerationTracker {
    /// key -> completion channel; the sender flips to `true` when the owner finishes
    in_flight: Arc<Mutex<HashMap<String, watch::Sender<bool>>>>,
}

impl RegenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the regeneration slot for `key`.
    ///
    /// Returns None if a regeneration for the key is already in flight. The
    /// caller must not start a second one and must not wait for the first.
    pub fn try_begin(&self, key: &str) -> Option<RegenerationGuard> {
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains_key(key) {
            return None;
        }

        let (sender, _receiver) = watch::channel(false);
        in_flight.insert(key.to_string(), sender);

        Some(RegenerationGuard {
            key: key.to_string(),
            tracker: self.clone(),
        })
    }

    /// True if a regeneration for `key` is running
    #[cfg(test)]
    pub(crate) fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    /// Get current number of in-flight regenerations
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Wait until the regeneration for `key` (if any) has finished
    pub async fn wait(&self, key: &str) {
        let receiver = {
            let in_flight = self.in_flight.lock();
            in_flight.get(key).map(|sender| sender.subscribe())
        };

        if let Some(mut receiver) = receiver {
            // Err means the sender is gone, which also means the owner finished
            let _ = receiver.wait_for(|&completed| completed).await;
        }
    }

    /// Wait until every regeneration running at the time of the call has finished
    pub async fn wait_all(&self) {
        let receivers: Vec<_> = self
            .in_flight
            .lock()
            .values()
            .map(|sender| sender.subscribe())
            .collect();

        join_all(receivers.into_iter().map(|mut receiver| async move {
            let _ = receiver.wait_for(|&completed| completed).await;
        }))
        .await;
    }

    fn finish(&self, key: &str) {
        let sender = self.in_flight.lock().remove(key);
        if let Some(sender) = sender {
            sender.send_replace(true);
        }
    }
}

/// Held by the task regenerating a key
///
/// Dropping it releases the slot, so a failed or panicked regeneration never
/// leaves the key marked as in flight.
#[derive(Debug)]
pub struct RegenerationGuard {
    key: String,
    tracker: RegenerationTracker,
}

impl RegenerationGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for RegenerationGuard {
    fn drop(&mut self) {
        self.tracker.finish(&self.key);
    }
}
