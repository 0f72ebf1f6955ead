//! Arena Sync Demo
//!
//! Drives a scripted three-peer match through the in-process room:
//! staggered joins, kills up to the target score, an authority handoff
//! mid-match, a restart, and a final convergence check across replicas.

use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;

use arena_sync::{
    ActorId, LocalRoom, MatchConfig, MatchPhase, Notification, SessionConfig, StatKind, VERSION,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arena Sync v{}", VERSION);
    demo_match();
}

/// Scripted match exercising the full protocol surface.
fn demo_match() {
    info!("=== Starting Demo Match ===");

    let config = MatchConfig {
        target_score: 3,
        match_duration_secs: 90.0,
        repeat_after_end: true,
        rotate_level_after_end: false,
        observe_camera_after_end: true,
    };
    let mut room = LocalRoom::new(config, SessionConfig::default());

    let start = Instant::now();
    let at = |secs: u64| start + Duration::from_secs(secs);

    // Staggered joins; alice creates the room and holds authority.
    let alice = room.join("Alice", at(0));
    let bob = room.join("Bob", at(1));
    let cara = room.join("Cara", at(3));

    info!(
        "room of {} peers, authority {:?}",
        room.len(),
        room.authority()
    );
    report_convergence(&room);

    // A couple of frags; stats fan out to every replica.
    record_frag(&mut room, bob, alice, at(10));
    record_frag(&mut room, cara, bob, at(14));
    room.pump_all(at(15));

    print_scoreboard(&room, cara);

    // The authority leaves mid-match; bob takes over countdown duties.
    info!("--- Authority leaves mid-match ---");
    room.leave(alice, at(20));
    info!("authority is now {:?}", room.authority());
    room.pump_all(at(26));
    report_convergence(&room);

    // Cara closes out the match at the target score.
    record_frag(&mut room, cara, bob, at(30));
    record_frag(&mut room, cara, bob, at(34));
    room.pump_all(at(35));

    for actor in room.actors() {
        let session = room.session(actor).expect("present");
        info!(%actor, phase = ?session.phase(), "post-match phase");
        assert_eq!(session.phase(), MatchPhase::Ending);
    }
    drain_notifications(&mut room);

    // Post-end delay elapses; the authority restarts the match in place.
    room.pump_all(at(42));
    for actor in room.actors() {
        let session = room.session(actor).expect("present");
        assert_eq!(session.phase(), MatchPhase::Playing);
    }
    info!("match restarted, scores reset");
    print_scoreboard(&room, bob);
    report_convergence(&room);

    info!("=== Demo Complete ===");
}

/// One kill: the killer reports the kill, the victim reports the death.
fn record_frag(room: &mut LocalRoom, killer: ActorId, victim: ActorId, now: Instant) {
    if let Some(session) = room.session_mut(killer) {
        session.record_kill(now).expect("killer in room");
    }
    if let Some(session) = room.session_mut(victim) {
        session.record_death(now).expect("victim in room");
    }
    room.flush(now);
    info!(%killer, %victim, "frag recorded");
}

fn print_scoreboard(room: &LocalRoom, viewpoint: ActorId) {
    let Some(session) = room.session(viewpoint) else {
        return;
    };
    info!("scoreboard as seen by {viewpoint}:");
    for p in session.roster().entries() {
        info!(
            "  {:<8} kills {:>2}  deaths {:>2}",
            p.name, p.kills, p.deaths
        );
    }
    info!(
        "  timer {:>5.1}s  phase {:?}",
        session.timer_remaining(),
        session.phase()
    );
}

/// Log interesting notifications and assert every replica reports the
/// same state digest.
fn report_convergence(room: &LocalRoom) {
    let digests = room.digests();
    for (actor, digest) in &digests {
        info!(%actor, digest = %hex::encode(&digest[..8]), "replica digest");
    }
    let first = digests.first().map(|(_, d)| *d).expect("room not empty");
    if digests.iter().all(|(_, d)| *d == first) {
        info!("CONVERGED: all replicas agree");
    } else {
        info!("DIVERGED: replica digests differ!");
    }
}

fn drain_notifications(room: &mut LocalRoom) {
    for actor in room.actors() {
        let Some(session) = room.session_mut(actor) else {
            continue;
        };
        for notification in session.take_notifications() {
            match notification {
                Notification::MatchEnded => info!(%actor, "view: match ended"),
                Notification::MatchRestarted => info!(%actor, "view: match restarted"),
                Notification::StatsChanged { actor: who, stat, value } => {
                    let label = match stat {
                        StatKind::Kills => "kills",
                        StatKind::Deaths => "deaths",
                    };
                    info!(%actor, "view: {who} {label} -> {value}");
                }
                Notification::SkinChanged { actor: who } => {
                    info!(%actor, "view: skin changed for {who}")
                }
                _ => {}
            }
        }
    }
}
