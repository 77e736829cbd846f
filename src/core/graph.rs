//! The order graph: the "held-while-acquiring" relation and its cycle check.
//!
//! An edge `A -> B` exists iff at some prior moment A was held by a thread
//! while B was acquired. Edges are stored as incoming sets on each record
//! (`LockRecord::before`) and are never removed. The admission check run
//! before an acquisition of L asks, for each currently held lock X, whether
//! a path `L -> ... -> X` already exists; if so, adding the imminent
//! `X -> L` edge would close a cycle and the acquisition is diagnosed as a
//! potential deadlock. The edge is added regardless: policy is
//! observe-and-warn, not prevent.
//!
//! Reachability is a breadth-first walk over before-sets (predecessors),
//! starting at X and searching for L. Query results are memoized per
//! (L, X) pair and invalidated by a generation counter that bumps on every
//! new edge.

use crate::core::registry::{LockRecord, LockRegistry};
use crate::core::types::LockId;
use fxhash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Memoized queries are dropped wholesale once the table grows past this.
const MEMO_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
struct MemoEntry {
    generation: u64,
    path: Option<Vec<LockId>>,
}

/// An inversion found by the admission check: acquiring `acquiring` while
/// holding `held` would close a cycle. `path` is the pre-existing chain
/// `acquiring -> ... -> held`.
#[derive(Debug, Clone)]
pub(crate) struct Inversion {
    pub acquiring: LockId,
    pub held: LockId,
    pub path: Vec<LockId>,
}

/// Working state for reachability queries: reused BFS buffers plus the
/// generation-stamped memo table.
pub(crate) struct OrderScratch {
    generation: u64,
    memo: FxHashMap<(LockId, LockId), MemoEntry>,
    queue: VecDeque<LockId>,
    visited: FxHashSet<LockId>,
    prev: FxHashMap<LockId, LockId>,
}

impl OrderScratch {
    pub(crate) fn new() -> Self {
        OrderScratch {
            generation: 0,
            memo: FxHashMap::default(),
            queue: VecDeque::with_capacity(32),
            visited: FxHashSet::default(),
            prev: FxHashMap::default(),
        }
    }

    /// Forget memoized reachability. Needed when a tombstoned record is
    /// reborn with an empty before-set (address reuse after destroy):
    /// that removes edges a cached path may rely on, which edge insertion
    /// alone never does.
    pub(crate) fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Backward BFS from `held` over before-sets, looking for `acquiring`.
    /// On a hit, returns the path `acquiring -> ... -> held` in forward
    /// (acquisition-order) direction.
    fn search(
        &mut self,
        table: &FxHashMap<LockId, LockRecord>,
        acquiring: LockId,
        held: LockId,
    ) -> Option<Vec<LockId>> {
        self.queue.clear();
        self.visited.clear();
        self.prev.clear();

        self.queue.push_back(held);
        self.visited.insert(held);

        while let Some(node) = self.queue.pop_front() {
            // Unknown ids have no recorded predecessors. Tombstoned records
            // still participate: their edges are evidence.
            let Some(record) = table.get(&node) else {
                continue;
            };
            for &pred in &record.before {
                if !self.visited.insert(pred) {
                    continue;
                }
                self.prev.insert(pred, node);
                if pred == acquiring {
                    let mut path = vec![acquiring];
                    let mut cur = acquiring;
                    while let Some(&next) = self.prev.get(&cur) {
                        path.push(next);
                        cur = next;
                    }
                    return Some(path);
                }
                self.queue.push_back(pred);
            }
        }
        None
    }
}

impl LockRegistry {
    /// Record `X -> acquired` for every held X. Called from post-lock, after
    /// the real acquisition succeeded. Self-edges are skipped; a genuinely
    /// new edge bumps the generation so stale memo entries die.
    pub(crate) fn record_edges(&mut self, held: &[LockId], acquired: LockId) {
        for &x in held {
            if x == acquired {
                continue;
            }
            let inserted = match self.table.get_mut(&acquired) {
                Some(record) => record.before.insert(x),
                None => false,
            };
            if inserted {
                self.order.generation = self.order.generation.wrapping_add(1);
            }
        }
    }

    /// The admission check: every held lock already reachable from
    /// `acquiring` yields an [`Inversion`].
    pub(crate) fn find_inversions(&mut self, acquiring: LockId, held: &[LockId]) -> Vec<Inversion> {
        let mut found = Vec::new();
        for &x in held {
            if x == acquiring {
                // Self-reentry is the error-checking mutex's to report.
                continue;
            }
            if let Some(path) = self.ordered_path(acquiring, x) {
                found.push(Inversion {
                    acquiring,
                    held: x,
                    path,
                });
            }
        }
        found
    }

    fn ordered_path(&mut self, acquiring: LockId, held: LockId) -> Option<Vec<LockId>> {
        let generation = self.order.generation;
        if let Some(hit) = self.order.memo.get(&(acquiring, held))
            && hit.generation == generation
        {
            return hit.path.clone();
        }
        let Self { table, order } = self;
        let path = order.search(table, acquiring, held);
        if order.memo.len() > MEMO_LIMIT {
            order.memo.clear();
        }
        order.memo.insert(
            (acquiring, held),
            MemoEntry {
                generation,
                path: path.clone(),
            },
        );
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::LockKind;

    const L1: LockId = 1;
    const L2: LockId = 2;
    const L3: LockId = 3;

    fn registry_with(ids: &[LockId]) -> LockRegistry {
        let mut reg = LockRegistry::new();
        for &id in ids {
            reg.optional_init(id, LockKind::Sleep);
        }
        reg
    }

    #[test]
    fn direct_inversion_is_found() {
        let mut reg = registry_with(&[L1, L2]);
        // L1 held while L2 acquired: edge L1 -> L2.
        reg.record_edges(&[L1], L2);

        // Now acquiring L1 while holding L2 closes the cycle.
        let found = reg.find_inversions(L1, &[L2]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].acquiring, L1);
        assert_eq!(found[0].held, L2);
        assert_eq!(found[0].path, vec![L1, L2]);
    }

    #[test]
    fn transitive_inversion_reports_the_full_path() {
        let mut reg = registry_with(&[L1, L2, L3]);
        reg.record_edges(&[L1], L2);
        reg.record_edges(&[L2], L3);

        let found = reg.find_inversions(L1, &[L3]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, vec![L1, L2, L3]);
    }

    #[test]
    fn consistent_ordering_is_silent() {
        let mut reg = registry_with(&[L1, L2, L3]);
        reg.record_edges(&[L1], L2);
        reg.record_edges(&[L2], L3);

        // Acquiring L3 while holding L1 follows the established order.
        assert!(reg.find_inversions(L3, &[L1]).is_empty());
        // Redundant shortcut edge is fine too.
        assert!(reg.find_inversions(L3, &[L1, L2]).is_empty());
    }

    #[test]
    fn held_lock_being_reacquired_is_skipped() {
        let mut reg = registry_with(&[L1]);
        assert!(reg.find_inversions(L1, &[L1]).is_empty());
    }

    #[test]
    fn memo_survives_repeat_queries_and_invalidates_on_new_edges() {
        let mut reg = registry_with(&[L1, L2]);
        assert!(reg.find_inversions(L1, &[L2]).is_empty());
        // Memo hit, same answer.
        assert!(reg.find_inversions(L1, &[L2]).is_empty());

        reg.record_edges(&[L1], L2);
        // Generation moved: the cached miss must not mask the new edge.
        assert_eq!(reg.find_inversions(L1, &[L2]).len(), 1);
    }

    #[test]
    fn edges_are_kept_when_a_middle_lock_is_destroyed() {
        let mut reg = registry_with(&[L1, L2, L3]);
        reg.record_edges(&[L1], L2);
        reg.record_edges(&[L2], L3);

        // L2 carries evidence, so destroy tombstones it.
        assert_eq!(reg.destroy(L2), Ok(()));
        assert!(reg.lookup(L2).is_none());

        // The path through the tombstone is still discoverable.
        let found = reg.find_inversions(L1, &[L3]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, vec![L1, L2, L3]);
    }

    #[test]
    fn reinit_of_a_middle_lock_invalidates_cached_paths() {
        let mut reg = registry_with(&[L1, L2, L3]);
        reg.record_edges(&[L1], L2);
        reg.record_edges(&[L2], L3);

        // Populate the memo with the path L1 -> L2 -> L3.
        assert_eq!(reg.find_inversions(L1, &[L3]).len(), 1);

        // L2 carries evidence, so destroy tombstones it; re-initializing
        // the address afterwards rebirths it with an empty before-set.
        assert_eq!(reg.destroy(L2), Ok(()));
        reg.optional_init(L2, LockKind::Sleep);

        // The cached path ran through the old L2 and must not survive.
        assert!(reg.find_inversions(L1, &[L3]).is_empty());
    }

    #[test]
    fn edge_recording_ignores_self_and_unknown_targets() {
        let mut reg = registry_with(&[L1]);
        reg.record_edges(&[L1], L1);
        assert!(
            reg.lookup(L1)
                .map(|info| info.before.is_empty())
                .unwrap_or(false)
        );
        // Target with no record: silently ignored.
        reg.record_edges(&[L1], L3);
        assert!(reg.lookup(L3).is_none());
    }
}
