//! Transport & Notification Boundary
//!
//! Types crossing the session's two outward seams: commands for the
//! external messaging substrate, and notifications for the local view and
//! audio collaborators. The session queues both; the driver drains them
//! after every call. Nothing here implements delivery.

use serde::{Deserialize, Serialize};

use crate::state::phase::MatchPhase;
use crate::state::roster::{ActorId, Participant, StatKind};
use crate::sync::events::MatchEvent;

/// Who should receive a broadcast event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipients {
    /// Every peer in the room, the sender included (the transport does
    /// not guarantee the sender's own copy arrives; the session never
    /// relies on it).
    All,
    /// Every peer except the sender.
    Others,
    /// The current authority only.
    AuthorityOnly,
    /// An explicit list of peers.
    Targets(Vec<ActorId>),
}

/// Delivery guarantee requested from the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    /// At-most-once-effective, in order per sender.
    Reliable,
    /// Best effort.
    Unreliable,
}

/// An instruction from the session to the external transport.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportCommand {
    /// Broadcast an event.
    Send {
        /// The event to deliver.
        event: MatchEvent,
        /// Who receives it.
        recipients: Recipients,
        /// Requested delivery guarantee.
        reliability: Reliability,
    },
    /// Leave the transport-level room.
    LeaveRoom,
    /// Destroy all networked match objects (authority, on match end).
    DestroyMatchObjects,
    /// Load another level for the next match (authority, on repeat).
    RotateLevel,
}

/// Outward notification consumed by view/audio collaborators.
///
/// Purely informational; collaborators never mutate match state directly
/// in response. Any reaction that changes shared state goes back through
/// an originated event.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// The match phase changed.
    PhaseChanged(MatchPhase),
    /// One participant's counter changed.
    StatsChanged {
        /// Whose counter.
        actor: ActorId,
        /// Which counter.
        stat: StatKind,
        /// The new value.
        value: u32,
    },
    /// The countdown value changed.
    TimerChanged {
        /// Seconds remaining.
        remaining_secs: f32,
    },
    /// A participant's skin assignment changed.
    SkinChanged {
        /// The assignee.
        actor: ActorId,
    },
    /// The roster was replaced wholesale.
    RosterReplaced {
        /// The new roster, in authoritative order.
        roster: Vec<Participant>,
    },
    /// The match entered `Ending`.
    MatchEnded,
    /// The match restarted in place.
    MatchRestarted,
    /// The local participant's respawn delay elapsed.
    RespawnDue,
}
