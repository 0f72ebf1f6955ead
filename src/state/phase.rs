//! Match Phase & Configuration
//!
//! The match's high-level lifecycle and the rules the authority broadcasts
//! at match start. Phase transitions are strictly gated; an illegal
//! transition is ignored and logged, never applied.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DEFAULT_MATCH_DURATION_SECS, DEFAULT_TARGET_SCORE};

/// High-level match lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Room entered, own join not yet confirmed.
    #[default]
    Waiting,
    /// Active play.
    Playing,
    /// Match over; terminal until a restart.
    Ending,
}

/// Rules for one match, set by the authority and broadcast once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Kill count that ends the match. Zero disables score-based ending.
    pub target_score: u32,
    /// Total match duration in seconds.
    pub match_duration_secs: f32,
    /// Start a fresh match after the post-end delay instead of leaving.
    pub repeat_after_end: bool,
    /// Rotate to another level when repeating.
    pub rotate_level_after_end: bool,
    /// Move the spectator camera to the observation point on match end.
    pub observe_camera_after_end: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            target_score: DEFAULT_TARGET_SCORE,
            match_duration_secs: DEFAULT_MATCH_DURATION_SECS,
            repeat_after_end: false,
            rotate_level_after_end: false,
            observe_camera_after_end: false,
        }
    }
}

/// Gated phase transitions.
///
/// The only permitted cycle is `Ending -> Playing` via [`restart`].
/// Every method reports whether the transition applied.
///
/// [`restart`]: PhaseMachine::restart
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseMachine {
    current: MatchPhase,
}

impl PhaseMachine {
    /// Start in `Waiting`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn current(&self) -> MatchPhase {
        self.current
    }

    /// `Waiting -> Playing`, on local join confirmation.
    pub fn begin_playing(&mut self) -> bool {
        self.transition(MatchPhase::Waiting, MatchPhase::Playing)
    }

    /// `Playing -> Ending`. Rejects `Waiting -> Ending`.
    pub fn end(&mut self) -> bool {
        self.transition(MatchPhase::Playing, MatchPhase::Ending)
    }

    /// `Ending -> Playing`, the restart cycle.
    pub fn restart(&mut self) -> bool {
        self.transition(MatchPhase::Ending, MatchPhase::Playing)
    }

    fn transition(&mut self, from: MatchPhase, to: MatchPhase) -> bool {
        if self.current != from {
            debug!(current = ?self.current, ?from, ?to, "phase transition rejected");
            return false;
        }
        self.current = to;
        true
    }
}
