//! Skin Pool Allocator
//!
//! A fixed pool of interchangeable skin tokens handed out to participants.
//! Freed tokens go to the back of the queue, so reuse is FIFO and a token
//! released by one participant is not immediately handed back to the next
//! checkout on the same frame.
//!
//! Only the authority allocates; every other replica applies the resulting
//! assignments verbatim (single-entry or wholesale snapshot) and never
//! makes allocation decisions of its own.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::roster::ActorId;

/// One allocatable skin slot, `0..pool size`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SkinId(pub u32);

impl std::fmt::Display for SkinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "skin#{}", self.0)
    }
}

/// Wholesale pool state shipped to a late joiner.
///
/// The free list preserves queue order; assignments are keyed by actor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinPoolSnapshot {
    /// Free tokens, front of the queue first.
    pub free: Vec<SkinId>,
    /// Current actor-to-token assignments.
    pub assignments: Vec<(ActorId, SkinId)>,
}

/// FIFO allocator over a fixed token range.
///
/// Invariant: the free queue and the assignment values partition
/// `{0..capacity}` exactly: every token is either free or assigned,
/// never both, never neither.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkinPool {
    free: VecDeque<SkinId>,
    assignments: BTreeMap<ActorId, SkinId>,
    capacity: u32,
}

impl SkinPool {
    /// Seed a pool with all of `0..capacity` free.
    pub fn new(capacity: u32) -> Self {
        Self {
            free: (0..capacity).map(SkinId).collect(),
            assignments: BTreeMap::new(),
            capacity,
        }
    }

    /// Dequeue the next free token and record it for `actor`.
    ///
    /// Returns `None` when the pool is exhausted; callers must not treat
    /// that as fatal.
    pub fn checkout(&mut self, actor: ActorId) -> Option<SkinId> {
        let Some(skin) = self.free.pop_front() else {
            warn!(%actor, "no available skins");
            return None;
        };
        self.record(actor, skin);
        Some(skin)
    }

    /// Return `actor`'s token to the back of the free queue.
    ///
    /// A no-op (not an error) when the actor holds nothing.
    pub fn release(&mut self, actor: ActorId) {
        let Some(skin) = self.assignments.remove(&actor) else {
            debug!(%actor, "release for actor without an assigned skin");
            return;
        };
        self.free.push_back(skin);
    }

    /// The token currently assigned to `actor`, if any.
    pub fn lookup(&self, actor: ActorId) -> Option<SkinId> {
        self.assignments.get(&actor).copied()
    }

    /// Apply an authoritative single-entry assignment.
    ///
    /// The token is pulled out of the free queue wherever it sits, and any
    /// token the actor previously held goes to the back, so the partition
    /// invariant survives out-of-band assignment. If another actor holds
    /// the token the authority's word wins and the old holder loses it.
    pub fn assign(&mut self, actor: ActorId, skin: SkinId) {
        if let Some(index) = self.free.iter().position(|s| *s == skin) {
            self.free.remove(index);
        } else if let Some(holder) = self.holder_of(skin) {
            if holder != actor {
                warn!(%skin, %holder, %actor, "reassigning a skin already held");
                self.assignments.remove(&holder);
            }
        }
        self.record(actor, skin);
    }

    /// Export the full pool state for a late joiner.
    pub fn export(&self) -> SkinPoolSnapshot {
        SkinPoolSnapshot {
            free: self.free.iter().copied().collect(),
            assignments: self.assignments.iter().map(|(a, s)| (*a, *s)).collect(),
        }
    }

    /// Replace the pool wholesale from an authoritative snapshot.
    pub fn import(&mut self, snapshot: SkinPoolSnapshot) {
        self.capacity = (snapshot.free.len() + snapshot.assignments.len()) as u32;
        self.free = snapshot.free.into();
        self.assignments = snapshot.assignments.into_iter().collect();
    }

    /// Total number of tokens in the pool.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of free tokens.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Current assignments in actor order.
    pub fn assignments(&self) -> impl Iterator<Item = (ActorId, SkinId)> + '_ {
        self.assignments.iter().map(|(a, s)| (*a, *s))
    }

    /// Free tokens, front of the queue first.
    pub fn free_list(&self) -> impl Iterator<Item = SkinId> + '_ {
        self.free.iter().copied()
    }

    fn holder_of(&self, skin: SkinId) -> Option<ActorId> {
        self.assignments
            .iter()
            .find(|(_, s)| **s == skin)
            .map(|(a, _)| *a)
    }

    fn record(&mut self, actor: ActorId, skin: SkinId) {
        if let Some(previous) = self.assignments.insert(actor, skin) {
            if previous != skin {
                self.free.push_back(previous);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn partition_holds(pool: &SkinPool) -> bool {
        let mut seen = BTreeSet::new();
        for skin in pool.free_list() {
            if !seen.insert(skin) {
                return false;
            }
        }
        for (_, skin) in pool.assignments() {
            if !seen.insert(skin) {
                return false;
            }
        }
        seen.len() == pool.capacity() as usize
            && seen.iter().enumerate().all(|(i, s)| s.0 == i as u32)
    }

    #[test]
    fn test_checkout_hands_out_in_order() {
        let mut pool = SkinPool::new(3);
        assert_eq!(pool.checkout(ActorId(1)), Some(SkinId(0)));
        assert_eq!(pool.checkout(ActorId(2)), Some(SkinId(1)));
        assert_eq!(pool.checkout(ActorId(3)), Some(SkinId(2)));
        assert_eq!(pool.checkout(ActorId(4)), None);
    }

    #[test]
    fn test_fifo_reuse_after_release() {
        let mut pool = SkinPool::new(3);
        for (i, actor) in [1u32, 2, 3].into_iter().enumerate() {
            assert_eq!(pool.checkout(ActorId(actor)), Some(SkinId(i as u32)));
        }

        pool.release(ActorId(1));
        pool.release(ActorId(2));
        pool.release(ActorId(3));

        // Released in order [0, 1, 2]; checkout must hand them back in
        // the same order.
        assert_eq!(pool.checkout(ActorId(4)), Some(SkinId(0)));
        assert_eq!(pool.checkout(ActorId(5)), Some(SkinId(1)));
        assert_eq!(pool.checkout(ActorId(6)), Some(SkinId(2)));
    }

    #[test]
    fn test_release_then_checkout_scenario() {
        // Pool of 4: checkout P1=0, P2=1, release P1, checkout P3 -> 0.
        let mut pool = SkinPool::new(4);
        assert_eq!(pool.checkout(ActorId(1)), Some(SkinId(0)));
        assert_eq!(pool.checkout(ActorId(2)), Some(SkinId(1)));
        pool.release(ActorId(1));

        assert_eq!(pool.checkout(ActorId(3)), Some(SkinId(0)));
        assert_eq!(pool.lookup(ActorId(2)), Some(SkinId(1)));
        assert_eq!(pool.lookup(ActorId(3)), Some(SkinId(0)));
        let free: Vec<SkinId> = pool.free_list().collect();
        assert_eq!(free, vec![SkinId(2), SkinId(3)]);
    }

    #[test]
    fn test_release_unknown_actor_is_noop() {
        let mut pool = SkinPool::new(2);
        pool.release(ActorId(7));
        assert_eq!(pool.available(), 2);
        assert!(partition_holds(&pool));
    }

    #[test]
    fn test_assign_removes_token_from_free_queue() {
        let mut pool = SkinPool::new(4);
        pool.assign(ActorId(1), SkinId(2));

        assert_eq!(pool.lookup(ActorId(1)), Some(SkinId(2)));
        let free: Vec<SkinId> = pool.free_list().collect();
        assert_eq!(free, vec![SkinId(0), SkinId(1), SkinId(3)]);
        assert!(partition_holds(&pool));
    }

    #[test]
    fn test_assign_returns_previous_token() {
        let mut pool = SkinPool::new(3);
        assert_eq!(pool.checkout(ActorId(1)), Some(SkinId(0)));
        pool.assign(ActorId(1), SkinId(2));

        assert_eq!(pool.lookup(ActorId(1)), Some(SkinId(2)));
        // Token 0 went back to the tail behind token 1.
        let free: Vec<SkinId> = pool.free_list().collect();
        assert_eq!(free, vec![SkinId(1), SkinId(0)]);
        assert!(partition_holds(&pool));
    }

    #[test]
    fn test_export_import_replaces_wholesale() {
        let mut source = SkinPool::new(4);
        source.checkout(ActorId(1));
        source.checkout(ActorId(2));
        source.release(ActorId(1));

        let mut replica = SkinPool::new(4);
        replica.checkout(ActorId(9));
        replica.import(source.export());

        assert_eq!(replica, source);
        assert!(partition_holds(&replica));
    }

    proptest! {
        #[test]
        fn prop_partition_invariant(ops in proptest::collection::vec((0u8..3, 0u32..6, 0u32..6), 0..64)) {
            let mut pool = SkinPool::new(6);
            for (op, actor, skin) in ops {
                match op {
                    0 => {
                        pool.checkout(ActorId(actor));
                    }
                    1 => pool.release(ActorId(actor)),
                    _ => pool.assign(ActorId(actor), SkinId(skin)),
                }
                prop_assert!(partition_holds(&pool));
            }
        }
    }
}
