//! Participant Roster
//!
//! Ordered ledger of match participants with their combat tallies.
//! The roster is the only owner of participant records; every other
//! component refers to participants by [`ActorId`].

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Unique participant identifier, assigned by the transport per connection.
///
/// Implements `Ord` so BTreeMap-keyed replicas iterate deterministically
/// and so authority election can pick the lowest surviving id.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ActorId(pub u32);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Which counter an `UpdateStats` event targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Confirmed kills.
    Kills,
    /// Deaths suffered.
    Deaths,
}

/// One connected identity in the match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Display name shown on leaderboards.
    pub name: String,
    /// Transport-assigned identity.
    pub actor: ActorId,
    /// Kill tally.
    pub kills: u32,
    /// Death tally.
    pub deaths: u32,
}

impl Participant {
    /// Create a participant with zeroed tallies.
    pub fn new(name: impl Into<String>, actor: ActorId) -> Self {
        Self {
            name: name.into(),
            actor,
            kills: 0,
            deaths: 0,
        }
    }

    /// Read the counter selected by `stat`.
    pub fn stat(&self, stat: StatKind) -> u32 {
        match stat {
            StatKind::Kills => self.kills,
            StatKind::Deaths => self.deaths,
        }
    }
}

/// Insertion-ordered participant ledger.
///
/// Stat updates never reorder the ledger; score-sorted presentation is a
/// view concern.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    entries: Vec<Participant>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole ledger with an authoritative list.
    pub fn replace_all(&mut self, entries: Vec<Participant>) {
        self.entries = entries;
    }

    /// Append a participant. Re-applying the same id overwrites the
    /// existing entry in place; it never creates a second one.
    pub fn add(&mut self, participant: Participant) {
        match self.entries.iter_mut().find(|p| p.actor == participant.actor) {
            Some(existing) => *existing = participant,
            None => self.entries.push(participant),
        }
    }

    /// Remove at most one entry, returning it if present.
    pub fn remove(&mut self, actor: ActorId) -> Option<Participant> {
        let index = self.entries.iter().position(|p| p.actor == actor)?;
        Some(self.entries.remove(index))
    }

    /// Apply a signed delta to one counter, saturating at zero.
    ///
    /// Returns the new value, or `None` for an unknown id (logged, not
    /// fatal).
    pub fn adjust(&mut self, actor: ActorId, stat: StatKind, delta: i32) -> Option<u32> {
        let Some(entry) = self.entries.iter_mut().find(|p| p.actor == actor) else {
            warn!(%actor, ?stat, delta, "stat update for unknown participant");
            return None;
        };

        let counter = match stat {
            StatKind::Kills => &mut entry.kills,
            StatKind::Deaths => &mut entry.deaths,
        };
        *counter = if delta >= 0 {
            counter.saturating_add(delta as u32)
        } else {
            counter.saturating_sub(delta.unsigned_abs())
        };
        Some(*counter)
    }

    /// Zero every participant's tallies. Used on match restart.
    pub fn reset_stats(&mut self) {
        for entry in &mut self.entries {
            entry.kills = 0;
            entry.deaths = 0;
        }
    }

    /// Look up a participant.
    pub fn get(&self, actor: ActorId) -> Option<&Participant> {
        self.entries.iter().find(|p| p.actor == actor)
    }

    /// Whether the id is present.
    pub fn contains(&self, actor: ActorId) -> bool {
        self.get(actor).is_some()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[Participant] {
        &self.entries
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut roster = Roster::new();
        roster.add(Participant::new("c", ActorId(3)));
        roster.add(Participant::new("a", ActorId(1)));
        roster.add(Participant::new("b", ActorId(2)));

        let ids: Vec<u32> = roster.entries().iter().map(|p| p.actor.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_add_duplicate_id_overwrites() {
        let mut roster = Roster::new();
        roster.add(Participant::new("old", ActorId(1)));
        roster.add(Participant::new("new", ActorId(1)));

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(ActorId(1)).unwrap().name, "new");
    }

    #[test]
    fn test_replace_all_is_idempotent() {
        let list = vec![
            Participant::new("a", ActorId(1)),
            Participant::new("b", ActorId(2)),
        ];

        let mut roster = Roster::new();
        roster.replace_all(list.clone());
        let first = roster.clone();
        roster.replace_all(list);

        assert_eq!(roster, first);
    }

    #[test]
    fn test_adjust_commutes_across_stats() {
        let mut a = Roster::new();
        a.add(Participant::new("p", ActorId(1)));
        let mut b = a.clone();

        a.adjust(ActorId(1), StatKind::Kills, 1);
        a.adjust(ActorId(1), StatKind::Deaths, 1);

        b.adjust(ActorId(1), StatKind::Deaths, 1);
        b.adjust(ActorId(1), StatKind::Kills, 1);

        assert_eq!(a, b);
        let p = a.get(ActorId(1)).unwrap();
        assert_eq!((p.kills, p.deaths), (1, 1));
    }

    #[test]
    fn test_adjust_saturates_at_zero() {
        let mut roster = Roster::new();
        roster.add(Participant::new("p", ActorId(1)));

        assert_eq!(roster.adjust(ActorId(1), StatKind::Kills, -5), Some(0));
        assert_eq!(roster.adjust(ActorId(1), StatKind::Kills, 2), Some(2));
        assert_eq!(roster.adjust(ActorId(1), StatKind::Kills, -1), Some(1));
    }

    #[test]
    fn test_adjust_unknown_id_is_noop() {
        let mut roster = Roster::new();
        assert_eq!(roster.adjust(ActorId(9), StatKind::Deaths, 1), None);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_remove_at_most_one() {
        let mut roster = Roster::new();
        roster.add(Participant::new("a", ActorId(1)));
        roster.add(Participant::new("b", ActorId(2)));

        assert!(roster.remove(ActorId(1)).is_some());
        assert!(roster.remove(ActorId(1)).is_none());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_reset_stats_zeroes_everyone() {
        let mut roster = Roster::new();
        roster.add(Participant::new("a", ActorId(1)));
        roster.add(Participant::new("b", ActorId(2)));
        roster.adjust(ActorId(1), StatKind::Kills, 4);
        roster.adjust(ActorId(2), StatKind::Deaths, 2);

        roster.reset_stats();

        assert!(roster.entries().iter().all(|p| p.kills == 0 && p.deaths == 0));
    }
}
