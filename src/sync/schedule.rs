//! Delayed Actions
//!
//! Cooperative replacement for timed continuations: the session schedules
//! an action for a wall-clock instant and its `pump` drains whatever has
//! come due. Leaving the room cancels everything pending. No threads, no
//! timers; the queue only moves when pumped.

use std::time::Instant;

/// A deferred session action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Periodic authoritative countdown resync.
    SyncTime,
    /// Post-end delay elapsed; repeat the match or leave.
    PostEnd,
    /// The local participant's respawn delay elapsed.
    Respawn,
}

/// Due-time ordered action queue.
#[derive(Clone, Debug, Default)]
pub struct Schedule {
    pending: Vec<(Instant, ScheduledAction)>,
}

impl Schedule {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` to fire at `due`.
    pub fn schedule(&mut self, due: Instant, action: ScheduledAction) {
        self.pending.push((due, action));
    }

    /// Drop everything pending. Called on room departure and match end.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Remove and return every action due at `now`, earliest first.
    /// Ties keep insertion order.
    pub fn take_due(&mut self, now: Instant) -> Vec<ScheduledAction> {
        let mut due: Vec<(Instant, ScheduledAction)> = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for (at, action) in self.pending.drain(..) {
            if at <= now {
                due.push((at, action));
            } else {
                still_pending.push((at, action));
            }
        }
        self.pending = still_pending;

        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, action)| action).collect()
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
