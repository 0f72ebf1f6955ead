//! # Arena Sync
//!
//! Replicated match-state synchronization for small multiplayer arena
//! matches. Each peer holds an independent replica of the shared match
//! state (roster, skin pool, countdown, phase) and keeps it converged with
//! every other peer's replica by exchanging typed events over an external
//! transport, with no central store and no history replay.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ARENA SYNC                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  state/          - Replicated state containers               │
//! │  ├── roster.rs   - Participant ledger, kill/death tallies    │
//! │  ├── skins.rs    - FIFO skin pool allocator                  │
//! │  ├── timer.rs    - Shared countdown, edge-triggered expiry   │
//! │  ├── phase.rs    - Match lifecycle machine + rules           │
//! │  └── digest.rs   - SHA-256 convergence digests               │
//! │                                                              │
//! │  sync/           - Event protocol and orchestration          │
//! │  ├── events.rs   - Ten-kind event taxonomy                   │
//! │  ├── transport.rs- Transport/notification boundary types     │
//! │  ├── schedule.rs - Cooperative delayed actions               │
//! │  ├── session.rs  - Per-peer dispatch + authority rules       │
//! │  └── room.rs     - In-process room driver (tests, demo)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Model
//!
//! Exactly one peer is the **authority** at any time, elected by the
//! transport's room-ownership mechanism. Only the authority originates the
//! events that settle globally-agreed state: the end-of-match phase change,
//! restarts, skin allocation, the match rules, and the periodic countdown
//! resync. The one multi-origin event, `UpdateStats`, carries additive
//! deltas and commutes across senders, so cross-sender delivery order does
//! not matter. The transport is assumed to deliver reliable events
//! at-most-once-effectively, in order per sender.
//!
//! Late joiners are bootstrapped with full-state snapshots (roster, pool,
//! countdown, rules) instead of event replay; nothing is persisted.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod state;
pub mod sync;

// Re-export commonly used types
pub use state::digest::{compute_state_digest, StateDigest};
pub use state::phase::{MatchConfig, MatchPhase};
pub use state::roster::{ActorId, Participant, Roster, StatKind};
pub use state::skins::{SkinId, SkinPool, SkinPoolSnapshot};
pub use state::timer::CountdownTimer;
pub use sync::events::MatchEvent;
pub use sync::room::{LocalRoom, RoomSideEffect};
pub use sync::session::{MatchSession, SessionConfig, SessionError};
pub use sync::transport::{Notification, Recipients, Reliability, TransportCommand};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds between authoritative countdown resyncs.
pub const TIME_SYNC_INTERVAL_SECS: u64 = 5;

/// Seconds between entering `Ending` and the authority's repeat/leave
/// decision.
pub const POST_END_DELAY_SECS: u64 = 7;

/// Default seconds between a local death and the respawn notification.
pub const DEFAULT_RESPAWN_DELAY_SECS: u64 = 5;

/// Default skin pool size.
pub const DEFAULT_SKIN_COUNT: u32 = 4;

/// Default kill count that ends a match.
pub const DEFAULT_TARGET_SCORE: u32 = 5;

/// Default match duration in seconds.
pub const DEFAULT_MATCH_DURATION_SECS: f32 = 180.0;
