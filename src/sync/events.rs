//! Protocol Events
//!
//! The closed set of state-change events exchanged between peers. Every
//! replica applies a received event through one exhaustive dispatch, so a
//! payload-shape mismatch cannot exist past the decode boundary.
//!
//! JSON is the debug-friendly wire text; bincode is the compact binary
//! form. Both use the externally-tagged enum representation.

use serde::{Deserialize, Serialize};

use crate::state::phase::{MatchConfig, MatchPhase};
use crate::state::roster::{ActorId, Participant, StatKind};
use crate::state::skins::{SkinId, SkinPoolSnapshot};

/// A discrete state-change event, broadcast over the external transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// A peer announces itself to the authority after entering the room.
    NewParticipant {
        /// Display name.
        name: String,
        /// The joiner's transport-assigned id.
        actor: ActorId,
        /// Starting kill tally (always zero on join).
        kills: u32,
        /// Starting death tally (always zero on join).
        deaths: u32,
    },

    /// Authoritative full roster; receivers replace wholesale.
    ListParticipants {
        /// Participants in authoritative order.
        roster: Vec<Participant>,
    },

    /// Additive stat delta. The only event any peer may originate about
    /// shared state; deltas commute across senders.
    UpdateStats {
        /// Whose counter changes.
        actor: ActorId,
        /// Which counter.
        stat: StatKind,
        /// Signed amount to add.
        delta: i32,
    },

    /// Authority-driven phase change.
    ChangePhase {
        /// The phase to enter.
        phase: MatchPhase,
    },

    /// Authority instruction to start a fresh match in place.
    RestartMatch,

    /// Authority instruction for every peer to leave the room.
    LeaveRoom,

    /// Periodic authoritative countdown reseed.
    SyncTime {
        /// Seconds remaining on the authority's countdown.
        remaining_secs: f32,
    },

    /// Match rules, broadcast by the authority.
    SetMatchInfo {
        /// The authoritative configuration.
        config: MatchConfig,
    },

    /// Single authoritative skin assignment.
    SetParticipantSkin {
        /// The assignee.
        actor: ActorId,
        /// The assigned token.
        skin: SkinId,
    },

    /// Full pool snapshot for a late joiner.
    SyncSkinInfo {
        /// Free list and assignments, replacing the receiver's pool.
        snapshot: SkinPoolSnapshot,
    },
}

impl MatchEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchEvent::NewParticipant { .. } => "new_participant",
            MatchEvent::ListParticipants { .. } => "list_participants",
            MatchEvent::UpdateStats { .. } => "update_stats",
            MatchEvent::ChangePhase { .. } => "change_phase",
            MatchEvent::RestartMatch => "restart_match",
            MatchEvent::LeaveRoom => "leave_room",
            MatchEvent::SyncTime { .. } => "sync_time",
            MatchEvent::SetMatchInfo { .. } => "set_match_info",
            MatchEvent::SetParticipantSkin { .. } => "set_participant_skin",
            MatchEvent::SyncSkinInfo { .. } => "sync_skin_info",
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<MatchEvent> {
        vec![
            MatchEvent::NewParticipant {
                name: "alice".into(),
                actor: ActorId(1),
                kills: 0,
                deaths: 0,
            },
            MatchEvent::ListParticipants {
                roster: vec![Participant::new("alice", ActorId(1))],
            },
            MatchEvent::UpdateStats {
                actor: ActorId(1),
                stat: StatKind::Kills,
                delta: 1,
            },
            MatchEvent::ChangePhase {
                phase: MatchPhase::Ending,
            },
            MatchEvent::RestartMatch,
            MatchEvent::LeaveRoom,
            MatchEvent::SyncTime {
                remaining_secs: 42.5,
            },
            MatchEvent::SetMatchInfo {
                config: MatchConfig::default(),
            },
            MatchEvent::SetParticipantSkin {
                actor: ActorId(1),
                skin: SkinId(2),
            },
            MatchEvent::SyncSkinInfo {
                snapshot: SkinPoolSnapshot {
                    free: vec![SkinId(2), SkinId(3)],
                    assignments: vec![(ActorId(1), SkinId(0))],
                },
            },
        ]
    }

    #[test]
    fn test_json_roundtrip_all_kinds() {
        for event in samples() {
            let json = event.to_json().unwrap();
            let parsed = MatchEvent::from_json(&json).unwrap();
            assert_eq!(parsed, event, "json mismatch for {}", event.kind());
        }
    }

    #[test]
    fn test_binary_roundtrip_all_kinds() {
        for event in samples() {
            let bytes = event.to_bytes().unwrap();
            let parsed = MatchEvent::from_bytes(&bytes).unwrap();
            assert_eq!(parsed, event, "binary mismatch for {}", event.kind());
        }
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(MatchEvent::from_json("{\"NoSuchEvent\":{}}").is_err());
        assert!(MatchEvent::from_json("not json").is_err());
    }
}
