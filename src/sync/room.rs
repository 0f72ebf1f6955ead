//! In-Process Room
//!
//! A driver that wires N sessions together the way the external transport
//! would: per-sender ordered delivery, recipient filtering, room lifecycle
//! fanout, and authority election (lowest surviving actor id). Used by the
//! demo binary and integration-style tests; it is a harness, not a network
//! implementation.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info};

use crate::state::digest::StateDigest;
use crate::state::phase::MatchConfig;
use crate::state::roster::ActorId;
use crate::sync::events::MatchEvent;
use crate::sync::session::{MatchSession, SessionConfig};
use crate::sync::transport::{Recipients, TransportCommand};

/// Non-messaging command a session handed to the room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomSideEffect {
    /// The peer left the room.
    LeftRoom,
    /// The authority destroyed all networked match objects.
    DestroyedMatchObjects,
    /// The authority requested a level rotation.
    RotatedLevel,
}

/// An in-process room of sessions with transport-like delivery semantics.
pub struct LocalRoom {
    sessions: BTreeMap<ActorId, MatchSession>,
    next_actor: u32,
    config: MatchConfig,
    session_config: SessionConfig,
    side_effects: Vec<(ActorId, RoomSideEffect)>,
}

impl LocalRoom {
    /// Create an empty room. Every joining peer gets a session built from
    /// these local defaults; the first joiner's copy becomes canonical.
    pub fn new(config: MatchConfig, session_config: SessionConfig) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_actor: 1,
            config,
            session_config,
            side_effects: Vec::new(),
        }
    }

    /// Add a peer and run the join choreography to quiescence.
    pub fn join(&mut self, name: impl Into<String>, now: Instant) -> ActorId {
        let actor = ActorId(self.next_actor);
        self.next_actor += 1;

        // Transport-level join precedes any app-level event delivery.
        for session in self.sessions.values_mut() {
            session.on_peer_joined(actor, now);
        }

        let authority = self.authority().unwrap_or(actor);
        let mut session = MatchSession::new(
            actor,
            name,
            self.config.clone(),
            self.session_config.clone(),
        );
        session
            .joined_room(authority, now)
            .expect("fresh session cannot have joined already");
        self.sessions.insert(actor, session);

        self.deliver(now);
        actor
    }

    /// A peer leaves voluntarily. Departure fanout and authority
    /// re-election run to quiescence.
    pub fn leave(&mut self, actor: ActorId, now: Instant) {
        if let Some(session) = self.sessions.get_mut(&actor) {
            session.leave();
        }
        self.deliver(now);
    }

    /// Pump every session one frame, then deliver whatever that produced.
    pub fn pump_all(&mut self, now: Instant) {
        let actors: Vec<ActorId> = self.sessions.keys().copied().collect();
        for actor in actors {
            if let Some(session) = self.sessions.get_mut(&actor) {
                session.pump(now);
            }
        }
        self.deliver(now);
    }

    /// The current authority: lowest surviving actor id.
    pub fn authority(&self) -> Option<ActorId> {
        self.sessions.keys().next().copied()
    }

    /// Borrow a peer's session.
    pub fn session(&self, actor: ActorId) -> Option<&MatchSession> {
        self.sessions.get(&actor)
    }

    /// Mutably borrow a peer's session (to originate local actions).
    pub fn session_mut(&mut self, actor: ActorId) -> Option<&mut MatchSession> {
        self.sessions.get_mut(&actor)
    }

    /// Deliver anything queued after direct session mutation.
    pub fn flush(&mut self, now: Instant) {
        self.deliver(now);
    }

    /// Actor ids currently in the room.
    pub fn actors(&self) -> Vec<ActorId> {
        self.sessions.keys().copied().collect()
    }

    /// Number of peers in the room.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the room is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// State digests of every replica, for convergence assertions.
    pub fn digests(&self) -> Vec<(ActorId, StateDigest)> {
        self.sessions
            .iter()
            .map(|(actor, session)| (*actor, session.state_digest()))
            .collect()
    }

    /// Drain recorded non-messaging side effects.
    pub fn take_side_effects(&mut self) -> Vec<(ActorId, RoomSideEffect)> {
        std::mem::take(&mut self.side_effects)
    }

    /// Drain session outboxes and deliver until nothing moves.
    fn deliver(&mut self, now: Instant) {
        loop {
            let mut progressed = false;
            let actors: Vec<ActorId> = self.sessions.keys().copied().collect();
            let mut departures: Vec<ActorId> = Vec::new();

            for actor in actors {
                let commands = match self.sessions.get_mut(&actor) {
                    Some(session) => session.take_commands(),
                    None => continue,
                };
                if !commands.is_empty() {
                    progressed = true;
                }

                for command in commands {
                    match command {
                        TransportCommand::Send {
                            event, recipients, ..
                        } => self.route(actor, event, recipients, now),
                        TransportCommand::LeaveRoom => departures.push(actor),
                        TransportCommand::DestroyMatchObjects => {
                            info!(%actor, "destroying networked match objects");
                            self.side_effects
                                .push((actor, RoomSideEffect::DestroyedMatchObjects));
                        }
                        TransportCommand::RotateLevel => {
                            info!(%actor, "rotating level");
                            self.side_effects.push((actor, RoomSideEffect::RotatedLevel));
                        }
                    }
                }
            }

            for actor in departures {
                self.remove_peer(actor, now);
            }

            if !progressed {
                break;
            }
        }
    }

    /// Deliver one event to its resolved recipients, in actor order.
    fn route(&mut self, sender: ActorId, event: MatchEvent, recipients: Recipients, now: Instant) {
        let targets: Vec<ActorId> = match recipients {
            Recipients::All => self.sessions.keys().copied().collect(),
            Recipients::Others => self
                .sessions
                .keys()
                .copied()
                .filter(|a| *a != sender)
                .collect(),
            Recipients::AuthorityOnly => self.authority().into_iter().collect(),
            Recipients::Targets(list) => list,
        };

        debug!(kind = event.kind(), %sender, ?targets, "routing event");
        for target in targets {
            if let Some(session) = self.sessions.get_mut(&target) {
                session.handle_event(event.clone(), sender, now);
            } else {
                debug!(kind = event.kind(), %target, "dropping event for absent peer");
            }
        }
    }

    fn remove_peer(&mut self, actor: ActorId, now: Instant) {
        let was_authority = self.authority() == Some(actor);
        if self.sessions.remove(&actor).is_none() {
            return;
        }
        info!(%actor, was_authority, "peer left room");
        self.side_effects.push((actor, RoomSideEffect::LeftRoom));

        let remaining: Vec<ActorId> = self.sessions.keys().copied().collect();

        // Authority moves before the departure is announced, so the new
        // authority is the one performing the canonical roster removal.
        if was_authority {
            if let Some(new_authority) = self.authority() {
                for peer in &remaining {
                    if let Some(session) = self.sessions.get_mut(peer) {
                        session.on_authority_changed(new_authority, now);
                    }
                }
            }
        }

        for peer in remaining {
            if let Some(session) = self.sessions.get_mut(&peer) {
                session.on_peer_left(actor, now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::phase::MatchPhase;
    use std::time::Duration;

    fn room(target: u32, repeat: bool) -> LocalRoom {
        LocalRoom::new(
            MatchConfig {
                target_score: target,
                match_duration_secs: 90.0,
                repeat_after_end: repeat,
                rotate_level_after_end: false,
                observe_camera_after_end: false,
            },
            SessionConfig::default(),
        )
    }

    fn assert_converged(room: &LocalRoom) {
        let digests = room.digests();
        let (first_actor, first) = digests.first().expect("room not empty");
        for (actor, digest) in &digests {
            assert_eq!(
                digest, first,
                "replica {actor} diverged from replica {first_actor}"
            );
        }
    }

    #[test]
    fn test_three_peers_converge_on_join() {
        let t0 = Instant::now();
        let mut room = room(5, true);
        let a = room.join("alice", t0);
        let b = room.join("bob", t0);
        let c = room.join("cara", t0);

        assert_eq!(room.authority(), Some(a));
        for actor in [a, b, c] {
            let session = room.session(actor).unwrap();
            assert_eq!(session.roster().len(), 3);
            assert_eq!(session.phase(), MatchPhase::Playing);
        }
        // Skins handed out in join order.
        let session = room.session(c).unwrap();
        assert_eq!(session.skins().lookup(a), Some(crate::state::skins::SkinId(0)));
        assert_eq!(session.skins().lookup(b), Some(crate::state::skins::SkinId(1)));
        assert_eq!(session.skins().lookup(c), Some(crate::state::skins::SkinId(2)));
        assert_converged(&room);
    }

    #[test]
    fn test_stats_propagate_to_everyone() {
        let t0 = Instant::now();
        let mut room = room(5, true);
        let a = room.join("alice", t0);
        let b = room.join("bob", t0);

        room.session_mut(b).unwrap().record_kill(t0).unwrap();
        room.session_mut(a).unwrap().record_death(t0).unwrap();
        room.flush(t0);

        for actor in [a, b] {
            let roster = room.session(actor).unwrap().roster();
            assert_eq!(roster.get(b).unwrap().kills, 1);
            assert_eq!(roster.get(a).unwrap().deaths, 1);
        }
        assert_converged(&room);
    }

    #[test]
    fn test_late_joiner_bootstraps_pool_and_roster() {
        let t0 = Instant::now();
        let mut room = room(5, true);
        let a = room.join("alice", t0);
        let b = room.join("bob", t0);
        room.session_mut(b).unwrap().record_kill(t0).unwrap();
        room.flush(t0);

        let c = room.join("cara", t0 + Duration::from_secs(10));

        let replica = room.session(c).unwrap();
        assert_eq!(replica.roster().len(), 3);
        assert_eq!(replica.roster().get(b).unwrap().kills, 1);
        assert_eq!(replica.skins().lookup(a), Some(crate::state::skins::SkinId(0)));
        assert_converged(&room);
    }

    #[test]
    fn test_threshold_kill_ends_match_everywhere_once() {
        let t0 = Instant::now();
        let mut room = room(2, true);
        let a = room.join("alice", t0);
        let b = room.join("bob", t0);

        room.session_mut(b).unwrap().record_kill(t0).unwrap();
        room.flush(t0);
        room.session_mut(b).unwrap().record_kill(t0).unwrap();
        room.flush(t0);

        for actor in [a, b] {
            assert_eq!(room.session(actor).unwrap().phase(), MatchPhase::Ending);
        }
        let effects = room.take_side_effects();
        let destroys = effects
            .iter()
            .filter(|(_, e)| *e == RoomSideEffect::DestroyedMatchObjects)
            .count();
        assert_eq!(destroys, 1);
        assert_converged(&room);
    }

    #[test]
    fn test_timer_expiry_ends_match_everywhere() {
        let t0 = Instant::now();
        let mut room = LocalRoom::new(
            MatchConfig {
                target_score: 0,
                match_duration_secs: 10.0,
                repeat_after_end: true,
                rotate_level_after_end: false,
                observe_camera_after_end: false,
            },
            SessionConfig::default(),
        );
        let a = room.join("alice", t0);
        let b = room.join("bob", t0);

        room.pump_all(t0 + Duration::from_secs(11));

        for actor in [a, b] {
            assert_eq!(room.session(actor).unwrap().phase(), MatchPhase::Ending);
        }
    }

    #[test]
    fn test_restart_after_post_end_delay() {
        let t0 = Instant::now();
        let mut room = room(1, true);
        let a = room.join("alice", t0);
        let b = room.join("bob", t0);

        room.session_mut(b).unwrap().record_kill(t0).unwrap();
        room.flush(t0);
        assert_eq!(room.session(a).unwrap().phase(), MatchPhase::Ending);

        room.pump_all(t0 + Duration::from_secs(8));

        for actor in [a, b] {
            let session = room.session(actor).unwrap();
            assert_eq!(session.phase(), MatchPhase::Playing);
            assert_eq!(session.roster().get(b).unwrap().kills, 0);
        }
        assert_converged(&room);
    }

    #[test]
    fn test_no_repeat_everyone_leaves() {
        let t0 = Instant::now();
        let mut room = room(1, false);
        room.join("alice", t0);
        let b = room.join("bob", t0);

        room.session_mut(b).unwrap().record_kill(t0).unwrap();
        room.flush(t0);
        room.pump_all(t0 + Duration::from_secs(8));

        assert!(room.is_empty());
        let effects = room.take_side_effects();
        let departures = effects
            .iter()
            .filter(|(_, e)| *e == RoomSideEffect::LeftRoom)
            .count();
        assert_eq!(departures, 2);
    }

    #[test]
    fn test_authority_handoff_on_leave() {
        let t0 = Instant::now();
        let mut room = room(5, true);
        let a = room.join("alice", t0);
        let b = room.join("bob", t0);
        let c = room.join("cara", t0);

        room.leave(a, t0 + Duration::from_secs(1));

        assert_eq!(room.authority(), Some(b));
        for actor in [b, c] {
            let session = room.session(actor).unwrap();
            assert_eq!(session.authority(), Some(b));
            assert_eq!(session.roster().len(), 2);
            // Alice's skin came back on every replica.
            assert!(session.skins().lookup(a).is_none());
        }
        assert_converged(&room);

        // The new authority resumes the periodic countdown resync.
        room.pump_all(t0 + Duration::from_secs(7));
        let remaining_b = room.session(b).unwrap().timer_remaining();
        let remaining_c = room.session(c).unwrap().timer_remaining();
        assert!((remaining_b - remaining_c).abs() < 0.01);
    }

    #[test]
    fn test_freed_skin_goes_to_next_joiner_fifo() {
        let t0 = Instant::now();
        let mut room = room(5, true);
        let a = room.join("alice", t0);
        let b = room.join("bob", t0);
        room.leave(a, t0);

        let c = room.join("cara", t0 + Duration::from_secs(1));

        // Skin 0 was freed first and the pool still had 2 and 3 queued, so
        // cara gets 2 and skin 0 waits its turn.
        let session = room.session(b).unwrap();
        assert_eq!(session.skins().lookup(c), Some(crate::state::skins::SkinId(2)));
        assert_converged(&room);
    }
}
