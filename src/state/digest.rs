//! Replica Convergence Digests
//!
//! Deterministic SHA-256 digests over the replicated state (roster, skin
//! pool, phase, configuration). Two replicas that have converged report
//! identical digests; the countdown is deliberately excluded because it
//! drifts between resyncs by design.
//!
//! Update order is fixed by the callers; changing it changes the digest.

use sha2::{Digest, Sha256};

use crate::state::phase::{MatchConfig, MatchPhase};
use crate::state::roster::Roster;
use crate::state::skins::SkinPool;

/// Digest output (256 bits).
pub type StateDigest = [u8; 32];

/// SHA-256 wrapper with fixed-width update helpers.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a hasher seeded with a domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create the hasher used for match-state digests.
    pub fn for_match_state() -> Self {
        Self::new(b"ARENA_SYNC_STATE_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f32 value (little-endian bit pattern).
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a bool as one byte.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with a length-prefixed string.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> StateDigest {
        self.hasher.finalize().into()
    }
}

/// Digest the replicated portion of a peer's match state.
pub fn compute_state_digest(
    phase: MatchPhase,
    config: &MatchConfig,
    roster: &Roster,
    skins: &SkinPool,
) -> StateDigest {
    let mut hasher = StateHasher::for_match_state();

    hasher.update_u8(phase as u8);

    hasher.update_u32(config.target_score);
    hasher.update_f32(config.match_duration_secs);
    hasher.update_bool(config.repeat_after_end);
    hasher.update_bool(config.rotate_level_after_end);
    hasher.update_bool(config.observe_camera_after_end);

    hasher.update_u32(roster.len() as u32);
    for participant in roster.entries() {
        hasher.update_u32(participant.actor.0);
        hasher.update_str(&participant.name);
        hasher.update_u32(participant.kills);
        hasher.update_u32(participant.deaths);
    }

    hasher.update_u32(skins.available() as u32);
    for skin in skins.free_list() {
        hasher.update_u32(skin.0);
    }
    hasher.update_u32(skins.assignments().count() as u32);
    for (actor, skin) in skins.assignments() {
        hasher.update_u32(actor.0);
        hasher.update_u32(skin.0);
    }

    hasher.finalize()
}
