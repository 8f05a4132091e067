//! Observer reference counting.
//!
//! The acquisition machine only runs while someone is watching the
//! location stream. [`SubscriptionHub`] tracks the live subscriber ids and
//! tells the coordinator exactly when the 0↔1 boundary is crossed so that
//! activation and deactivation each fire once per transition. All
//! mutations happen on the coordinator task, so there is no locking here.

use std::collections::HashSet;

/// Tracks live location-stream subscribers.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionHub {
    active: HashSet<u64>,
}

impl SubscriptionHub {
    /// Register a subscriber. Returns true when this crossed 0→1.
    pub(crate) fn subscribe(&mut self, id: u64) -> bool {
        let was_empty = self.active.is_empty();
        self.active.insert(id);
        was_empty && !self.active.is_empty()
    }

    /// Remove a subscriber. Returns true when this crossed 1→0.
    ///
    /// Unknown ids (double unsubscribe) are a no-op.
    pub(crate) fn unsubscribe(&mut self, id: u64) -> bool {
        self.active.remove(&id) && self.active.is_empty()
    }

    /// Whether any subscriber is live.
    pub(crate) fn is_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Number of live subscribers.
    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.active.len()
    }
}
