//! Replicated State Containers
//!
//! Pure in-memory match state, one replica per peer. Containers never
//! perform I/O, never read the clock (instants are handed in), and are
//! mutated only by the owning session's event dispatch.
//!
//! ## Module Structure
//!
//! - `roster`: participant ledger with kill/death tallies
//! - `skins`: FIFO skin pool allocator
//! - `timer`: shared countdown with edge-triggered expiry
//! - `phase`: match lifecycle machine and match configuration
//! - `digest`: SHA-256 convergence digests over replicated state

pub mod digest;
pub mod phase;
pub mod roster;
pub mod skins;
pub mod timer;

pub use digest::{compute_state_digest, StateDigest, StateHasher};
pub use phase::{MatchConfig, MatchPhase, PhaseMachine};
pub use roster::{ActorId, Participant, Roster, StatKind};
pub use skins::{SkinId, SkinPool, SkinPoolSnapshot};
pub use timer::CountdownTimer;
