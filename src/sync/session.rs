//! Match Session
//!
//! One `MatchSession` per peer: the single owner of that peer's replicated
//! state and the only place events are applied. Local actions are
//! translated into outbound events, received events are dispatched through
//! one exhaustive match, and everything the outside world needs to do in
//! response is queued on two outboxes (transport commands, outward
//! notifications) drained by the driver.
//!
//! Authority gating happens in exactly one place: [`MatchSession::is_authority`],
//! recomputed only when the transport reports an authority change.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::state::digest::{compute_state_digest, StateDigest};
use crate::state::phase::{MatchConfig, MatchPhase, PhaseMachine};
use crate::state::roster::{ActorId, Participant, Roster, StatKind};
use crate::state::skins::{SkinPool, SkinPoolSnapshot};
use crate::state::timer::CountdownTimer;
use crate::sync::events::MatchEvent;
use crate::sync::schedule::{Schedule, ScheduledAction};
use crate::sync::transport::{Notification, Recipients, Reliability, TransportCommand};
use crate::{DEFAULT_RESPAWN_DELAY_SECS, DEFAULT_SKIN_COUNT, POST_END_DELAY_SECS, TIME_SYNC_INTERVAL_SECS};

/// Engine knobs local to one peer; never broadcast.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Size of the skin pool.
    pub skin_count: u32,
    /// Cadence of the authoritative countdown resync. Bounds the visible
    /// drift of non-authority countdowns; a tunable, not a correctness
    /// requirement.
    pub time_sync_interval: Duration,
    /// Delay between entering `Ending` and the authority's repeat/leave
    /// decision.
    pub post_end_delay: Duration,
    /// Delay between a local death and the respawn notification.
    pub respawn_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            skin_count: DEFAULT_SKIN_COUNT,
            time_sync_interval: Duration::from_secs(TIME_SYNC_INTERVAL_SECS),
            post_end_delay: Duration::from_secs(POST_END_DELAY_SECS),
            respawn_delay: Duration::from_secs(DEFAULT_RESPAWN_DELAY_SECS),
        }
    }
}

/// Session misuse errors. Benign in-match absences (unknown ids, pool
/// exhaustion) are absorbed with logs instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session already joined a room.
    #[error("session already joined a room")]
    AlreadyJoined,

    /// The session has not joined a room yet.
    #[error("session has not joined a room")]
    NotJoined,

    /// The session was torn down.
    #[error("session is closed")]
    Closed,
}

/// Per-peer replicated match state and the protocol that keeps it
/// converged with every other peer's replica.
pub struct MatchSession {
    actor: ActorId,
    name: String,
    config: MatchConfig,
    session_config: SessionConfig,

    phase: PhaseMachine,
    roster: Roster,
    skins: SkinPool,
    timer: CountdownTimer,
    schedule: Schedule,

    authority: Option<ActorId>,
    announced: bool,
    joined: bool,
    closed: bool,

    commands: Vec<TransportCommand>,
    notifications: Vec<Notification>,
}

impl MatchSession {
    /// Create a session for the local peer. `config` is this peer's local
    /// copy of the match rules; the authority's copy becomes canonical
    /// once broadcast.
    pub fn new(
        actor: ActorId,
        name: impl Into<String>,
        config: MatchConfig,
        session_config: SessionConfig,
    ) -> Self {
        let skins = SkinPool::new(session_config.skin_count);
        Self {
            actor,
            name: name.into(),
            config,
            session_config,
            phase: PhaseMachine::new(),
            roster: Roster::new(),
            skins,
            timer: CountdownTimer::new(),
            schedule: Schedule::new(),
            authority: None,
            announced: false,
            joined: false,
            closed: false,
            commands: Vec::new(),
            notifications: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The local peer's id.
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// Current match phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase.current()
    }

    /// The local copy of the match rules.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// The participant ledger.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The skin pool replica.
    pub fn skins(&self) -> &SkinPool {
        &self.skins
    }

    /// Seconds left on the local countdown.
    pub fn timer_remaining(&self) -> f32 {
        self.timer.remaining()
    }

    /// The current authority, if known.
    pub fn authority(&self) -> Option<ActorId> {
        self.authority
    }

    /// Whether the local peer is the authority right now. The single
    /// predicate behind every authority-gated path.
    pub fn is_authority(&self) -> bool {
        self.authority == Some(self.actor)
    }

    /// Whether the session was torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drain queued transport commands.
    pub fn take_commands(&mut self) -> Vec<TransportCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Drain queued outward notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Digest of the replicated state, for convergence checks.
    pub fn state_digest(&self) -> StateDigest {
        compute_state_digest(self.phase.current(), &self.config, &self.roster, &self.skins)
    }

    // =========================================================================
    // Room lifecycle (driven by the external transport)
    // =========================================================================

    /// The local peer entered the room. Announces the participant to the
    /// authority and, when the local peer holds authority, seeds the
    /// countdown and broadcasts the match rules.
    pub fn joined_room(&mut self, authority: ActorId, now: Instant) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if self.joined {
            return Err(SessionError::AlreadyJoined);
        }
        self.joined = true;
        self.authority = Some(authority);
        info!(actor = %self.actor, %authority, "joined room");

        if !self.announced {
            self.announced = true;
            let hello = MatchEvent::NewParticipant {
                name: self.name.clone(),
                actor: self.actor,
                kills: 0,
                deaths: 0,
            };
            if self.is_authority() {
                // The authority's own announcement is applied in place;
                // echo through the transport is not guaranteed.
                self.apply_new_participant(self.name.clone(), self.actor, 0, 0);
            } else {
                self.send(hello, Recipients::AuthorityOnly);
            }

            if self.phase.begin_playing() {
                self.notify(Notification::PhaseChanged(MatchPhase::Playing));
            }
        }

        if self.is_authority() {
            self.timer.set(self.config.match_duration_secs, now);
            self.notify(Notification::TimerChanged {
                remaining_secs: self.timer.remaining(),
            });
            self.schedule
                .schedule(now + self.session_config.time_sync_interval, ScheduledAction::SyncTime);
            self.send(
                MatchEvent::SetMatchInfo {
                    config: self.config.clone(),
                },
                Recipients::Others,
            );
        }
        Ok(())
    }

    /// Another peer entered the room at the transport level. The authority
    /// sends it the match rules and the current countdown so it is caught
    /// up before the roster broadcast lands.
    pub fn on_peer_joined(&mut self, peer: ActorId, _now: Instant) {
        if !self.active() || !self.is_authority() {
            return;
        }
        self.send(
            MatchEvent::SetMatchInfo {
                config: self.config.clone(),
            },
            Recipients::Targets(vec![peer]),
        );
        self.send(
            MatchEvent::SyncTime {
                remaining_secs: self.timer.remaining(),
            },
            Recipients::Targets(vec![peer]),
        );
    }

    /// A peer left the room. The authority removes it from the ledger and
    /// rebroadcasts the roster; every peer, authority or not, releases the
    /// departed peer's skin locally.
    pub fn on_peer_left(&mut self, peer: ActorId, _now: Instant) {
        if !self.active() {
            return;
        }
        if self.is_authority() && self.roster.remove(peer).is_some() {
            info!(%peer, "removed departed participant from roster");
            self.send(
                MatchEvent::ListParticipants {
                    roster: self.roster.entries().to_vec(),
                },
                Recipients::Others,
            );
            self.notify(Notification::RosterReplaced {
                roster: self.roster.entries().to_vec(),
            });
        }
        // Deliberately done on every replica, not only the authority.
        self.skins.release(peer);
    }

    /// The transport elected a new authority after the previous one left.
    /// A peer that just became authority resumes the periodic countdown
    /// resync; countdown-expiry duty follows the predicate automatically.
    pub fn on_authority_changed(&mut self, new_authority: ActorId, now: Instant) {
        if !self.active() || self.authority == Some(new_authority) {
            return;
        }
        self.authority = Some(new_authority);
        info!(actor = %self.actor, %new_authority, "authority changed");

        if self.is_authority() {
            self.schedule
                .schedule(now + self.session_config.time_sync_interval, ScheduledAction::SyncTime);
            // The expiry edge may have passed while this peer was not in
            // charge; settle it now instead of waiting forever.
            if self.phase.current() == MatchPhase::Playing
                && self.timer.is_seeded()
                && self.timer.is_expired()
            {
                info!("countdown already expired at handoff");
                self.end_match(now);
            }
        }
    }

    /// The transport connection dropped. Terminal: pending actions are
    /// cancelled and the session closes; no reconnection is attempted.
    pub fn on_disconnected(&mut self) {
        if self.closed {
            return;
        }
        warn!(actor = %self.actor, "disconnected from transport");
        self.teardown();
    }

    // =========================================================================
    // Local actions (translated into outbound events)
    // =========================================================================

    /// Report a stat change. Applies locally, broadcasts to the other
    /// peers; deltas are additive so application order across senders
    /// does not matter.
    pub fn update_stats(
        &mut self,
        actor: ActorId,
        stat: StatKind,
        delta: i32,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        // Broadcast before the local apply so a threshold-triggered phase
        // change never overtakes the stat update on the wire.
        self.send(
            MatchEvent::UpdateStats { actor, stat, delta },
            Recipients::Others,
        );
        self.apply_update_stats(actor, stat, delta, now);
        Ok(())
    }

    /// The local participant scored a kill.
    pub fn record_kill(&mut self, now: Instant) -> Result<(), SessionError> {
        self.update_stats(self.actor, StatKind::Kills, 1, now)
    }

    /// The local participant died. Reports the death and schedules the
    /// respawn notification.
    pub fn record_death(&mut self, now: Instant) -> Result<(), SessionError> {
        self.update_stats(self.actor, StatKind::Deaths, 1, now)?;
        if self.phase.current() != MatchPhase::Ending {
            self.schedule
                .schedule(now + self.session_config.respawn_delay, ScheduledAction::Respawn);
        }
        Ok(())
    }

    /// Leave the room voluntarily. Cancels everything pending and closes
    /// the session.
    pub fn leave(&mut self) {
        if self.closed {
            return;
        }
        info!(actor = %self.actor, "leaving room");
        self.commands.push(TransportCommand::LeaveRoom);
        self.teardown();
    }

    // =========================================================================
    // Event dispatch
    // =========================================================================

    /// Apply one delivered event. The transport guarantees per-sender
    /// ordering and at-most-once-effective delivery for reliable events.
    pub fn handle_event(&mut self, event: MatchEvent, sender: ActorId, now: Instant) {
        if !self.active() {
            debug!(kind = event.kind(), %sender, "event ignored by inactive session");
            return;
        }
        debug!(kind = event.kind(), %sender, "applying event");

        match event {
            MatchEvent::NewParticipant {
                name,
                actor,
                kills,
                deaths,
            } => {
                if self.is_authority() {
                    self.apply_new_participant(name, actor, kills, deaths);
                } else {
                    warn!(%sender, "participant announcement delivered to non-authority");
                }
            }
            MatchEvent::ListParticipants { roster } => {
                self.roster.replace_all(roster);
                self.notify(Notification::RosterReplaced {
                    roster: self.roster.entries().to_vec(),
                });
            }
            MatchEvent::UpdateStats { actor, stat, delta } => {
                self.apply_update_stats(actor, stat, delta, now);
            }
            MatchEvent::ChangePhase { phase } => self.apply_change_phase(phase, now),
            MatchEvent::RestartMatch => self.apply_restart(now),
            MatchEvent::LeaveRoom => self.leave(),
            MatchEvent::SyncTime { remaining_secs } => {
                self.timer.set(remaining_secs, now);
                self.notify(Notification::TimerChanged {
                    remaining_secs: self.timer.remaining(),
                });
            }
            MatchEvent::SetMatchInfo { config } => {
                self.config = config;
            }
            MatchEvent::SetParticipantSkin { actor, skin } => {
                self.skins.assign(actor, skin);
                self.notify(Notification::SkinChanged { actor });
            }
            MatchEvent::SyncSkinInfo { snapshot } => self.apply_skin_snapshot(snapshot),
        }
    }

    // =========================================================================
    // Frame pump
    // =========================================================================

    /// Advance the countdown and fire due scheduled actions. Called once
    /// per frame on the peer's single logical thread.
    pub fn pump(&mut self, now: Instant) {
        if !self.active() {
            return;
        }

        if self.phase.current() == MatchPhase::Playing {
            let expired = self.timer.tick(now);
            self.notify(Notification::TimerChanged {
                remaining_secs: self.timer.remaining(),
            });
            if expired && self.is_authority() {
                info!("match time expired");
                self.end_match(now);
            }
        }

        for action in self.schedule.take_due(now) {
            match action {
                ScheduledAction::SyncTime => {
                    if self.is_authority() {
                        self.send(
                            MatchEvent::SyncTime {
                                remaining_secs: self.timer.remaining(),
                            },
                            Recipients::Others,
                        );
                        self.schedule.schedule(
                            now + self.session_config.time_sync_interval,
                            ScheduledAction::SyncTime,
                        );
                    }
                }
                ScheduledAction::PostEnd => {
                    if self.is_authority() {
                        self.post_end_sequence(now);
                    }
                }
                ScheduledAction::Respawn => {
                    if self.phase.current() != MatchPhase::Ending {
                        self.notify(Notification::RespawnDue);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Application helpers
    // =========================================================================

    /// Authority-side join choreography. Ordering matters: the joiner's
    /// pool must be consistent with the authority's before the rest of the
    /// room is told the joiner exists.
    fn apply_new_participant(&mut self, name: String, actor: ActorId, kills: u32, deaths: u32) {
        let participant = Participant {
            name,
            actor,
            kills,
            deaths,
        };
        info!(%actor, name = %participant.name, "participant joined");
        self.roster.add(participant);
        self.notify(Notification::RosterReplaced {
            roster: self.roster.entries().to_vec(),
        });

        if let Some(skin) = self.skins.checkout(actor) {
            self.notify(Notification::SkinChanged { actor });
            self.send(
                MatchEvent::SetParticipantSkin { actor, skin },
                Recipients::Others,
            );
        }

        if self.authority != Some(actor) {
            self.send(
                MatchEvent::SyncSkinInfo {
                    snapshot: self.skins.export(),
                },
                Recipients::Targets(vec![actor]),
            );
        }

        self.send(
            MatchEvent::ListParticipants {
                roster: self.roster.entries().to_vec(),
            },
            Recipients::Others,
        );
    }

    fn apply_update_stats(&mut self, actor: ActorId, stat: StatKind, delta: i32, now: Instant) {
        let Some(value) = self.roster.adjust(actor, stat, delta) else {
            return;
        };
        self.notify(Notification::StatsChanged { actor, stat, value });

        // Only the authority decides the match is over; other peers wait
        // for its phase broadcast even if they see the threshold first.
        if stat == StatKind::Kills && self.is_authority() {
            self.check_end_condition(value, now);
        }
    }

    fn check_end_condition(&mut self, kills: u32, now: Instant) {
        if self.config.target_score > 0
            && kills >= self.config.target_score
            && self.phase.current() == MatchPhase::Playing
        {
            info!(kills, target = self.config.target_score, "target score reached");
            self.end_match(now);
        }
    }

    /// Authority-side match end: broadcast the phase change and apply it
    /// locally. The `Playing -> Ending` gate makes this fire at most once
    /// per match even if several threshold crossings race in.
    fn end_match(&mut self, now: Instant) {
        if self.phase.current() != MatchPhase::Playing {
            return;
        }
        self.send(
            MatchEvent::ChangePhase {
                phase: MatchPhase::Ending,
            },
            Recipients::Others,
        );
        self.enter_ending(now);
    }

    fn apply_change_phase(&mut self, phase: MatchPhase, now: Instant) {
        match phase {
            MatchPhase::Ending => self.enter_ending(now),
            MatchPhase::Playing => {
                if self.phase.begin_playing() {
                    self.notify(Notification::PhaseChanged(MatchPhase::Playing));
                }
            }
            MatchPhase::Waiting => {
                warn!("phase change to waiting is never broadcast; ignored");
            }
        }
    }

    fn enter_ending(&mut self, now: Instant) {
        if !self.phase.end() {
            return;
        }
        info!(actor = %self.actor, "match ended");
        self.notify(Notification::PhaseChanged(MatchPhase::Ending));
        self.notify(Notification::MatchEnded);

        if self.is_authority() {
            self.commands.push(TransportCommand::DestroyMatchObjects);
        }

        // Win-condition checks stop via the phase gate; in-flight delayed
        // work is dropped and only the post-end decision remains.
        self.schedule.cancel_all();
        self.schedule
            .schedule(now + self.session_config.post_end_delay, ScheduledAction::PostEnd);
    }

    /// The authority's decision after the post-end delay: repeat the match
    /// (rotating the level when configured) or send everyone home.
    fn post_end_sequence(&mut self, now: Instant) {
        if self.config.repeat_after_end {
            if self.config.rotate_level_after_end {
                info!("rotating level for the next match");
                self.commands.push(TransportCommand::RotateLevel);
            } else {
                self.send(MatchEvent::RestartMatch, Recipients::Others);
                self.apply_restart(now);
            }
        } else {
            self.send(MatchEvent::LeaveRoom, Recipients::Others);
            self.leave();
        }
    }

    fn apply_restart(&mut self, now: Instant) {
        if !self.phase.restart() {
            warn!(phase = ?self.phase.current(), "restart ignored outside ending phase");
            return;
        }
        info!(actor = %self.actor, "match restarted");
        self.notify(Notification::PhaseChanged(MatchPhase::Playing));
        self.notify(Notification::MatchRestarted);

        if self.is_authority() {
            self.roster.reset_stats();
            self.send(
                MatchEvent::ListParticipants {
                    roster: self.roster.entries().to_vec(),
                },
                Recipients::Others,
            );
            self.notify(Notification::RosterReplaced {
                roster: self.roster.entries().to_vec(),
            });
            self.timer.set(self.config.match_duration_secs, now);
            self.notify(Notification::TimerChanged {
                remaining_secs: self.timer.remaining(),
            });
            self.schedule
                .schedule(now + self.session_config.time_sync_interval, ScheduledAction::SyncTime);
        }
    }

    fn apply_skin_snapshot(&mut self, snapshot: SkinPoolSnapshot) {
        self.skins.import(snapshot);
        let actors: Vec<ActorId> = self.skins.assignments().map(|(a, _)| a).collect();
        for actor in actors {
            self.notify(Notification::SkinChanged { actor });
        }
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn active(&self) -> bool {
        self.joined && !self.closed
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if !self.joined {
            return Err(SessionError::NotJoined);
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.schedule.cancel_all();
        self.closed = true;
    }

    fn send(&mut self, event: MatchEvent, recipients: Recipients) {
        self.commands.push(TransportCommand::Send {
            event,
            recipients,
            reliability: Reliability::Reliable,
        });
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}
