//! Shared Countdown
//!
//! One decreasing time value per replica, ticked against wall-clock
//! instants handed in by the caller. The expiry notification is
//! edge-triggered: it fires exactly once per countdown cycle and is only
//! re-armed by seeding the timer above zero.
//!
//! Non-authority replicas tick purely for presentation; the authority's
//! periodic `SyncTime` reseed bounds their visible drift to one resync
//! interval.

use std::time::Instant;

/// Countdown with an edge-triggered expiry latch.
#[derive(Clone, Debug)]
pub struct CountdownTimer {
    remaining: f32,
    last_update: Option<Instant>,
    expiry_notified: bool,
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self {
            remaining: 0.0,
            last_update: None,
            // A fresh timer sits at zero without announcing an expiry.
            expiry_notified: true,
        }
    }
}

impl CountdownTimer {
    /// Create an idle timer at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the remaining time and reset the tick reference point.
    ///
    /// Used both for initial seeding and for authoritative resyncs.
    /// Seeding above zero re-arms the expiry notification; seeding at or
    /// below zero clamps to zero without announcing anything.
    pub fn set(&mut self, seconds: f32, now: Instant) {
        self.remaining = seconds.max(0.0);
        self.last_update = Some(now);
        self.expiry_notified = self.remaining <= 0.0;
    }

    /// Subtract the wall-clock time elapsed since the last update.
    ///
    /// Returns `true` exactly once per cycle, on the tick where the value
    /// crosses zero. The value clamps at zero and never increases.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_update else {
            return false;
        };
        self.remaining -= now.saturating_duration_since(last).as_secs_f32();
        self.last_update = Some(now);

        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            if !self.expiry_notified {
                self.expiry_notified = true;
                return true;
            }
        }
        false
    }

    /// Seconds left, clamped at zero.
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Whether the timer has ever been seeded by `set`.
    pub fn is_seeded(&self) -> bool {
        self.last_update.is_some()
    }

    /// Whether the countdown has reached zero.
    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}
