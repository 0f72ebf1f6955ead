//! Event Synchronization Layer
//!
//! The protocol that keeps every peer's state replica converged: the event
//! taxonomy, the per-peer session that originates and applies events, the
//! cooperative schedule behind delayed actions, and the boundary types for
//! the external transport and the view-facing notification surface.
//!
//! ## Module Structure
//!
//! - `events`: the ten-kind event taxonomy and wire helpers
//! - `transport`: recipients, reliability, transport commands, notifications
//! - `schedule`: delayed-action queue drained by the session pump
//! - `session`: per-peer dispatch, authority rules, join/leave choreography
//! - `room`: in-process driver for tests and the demo binary

pub mod events;
pub mod room;
pub mod schedule;
pub mod session;
pub mod transport;

pub use events::MatchEvent;
pub use room::{LocalRoom, RoomSideEffect};
pub use schedule::{Schedule, ScheduledAction};
pub use session::{MatchSession, SessionConfig, SessionError};
pub use transport::{Notification, Recipients, Reliability, TransportCommand};
