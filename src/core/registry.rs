//! The process-wide lock registry.
//!
//! One [`LockRecord`] per distinct lock the process has observed, keyed by
//! the lock's address. A single mutex guards the table and every record's
//! before-set; all critical sections are short and CPU-only. Records come
//! into existence either through an explicit init wrapper or through
//! optional-init on first use, which is how statically initialized locks
//! get registered.

use crate::core::graph::OrderScratch;
use crate::core::types::{LockError, LockId, LockKind, ThreadId};
use chrono::{DateTime, Utc};
use fxhash::{FxHashMap, FxHashSet};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;

/// Outcome of an init operation, used by the hooks layer to decide whether
/// a double-init diagnostic is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    AlreadyPresent,
}

/// Registry-side state for one observed lock.
pub struct LockRecord {
    kind: LockKind,
    created_at: DateTime<Utc>,
    /// Incoming order edges: every lock ever held at the moment this one
    /// was acquired. Never pruned.
    pub(crate) before: FxHashSet<LockId>,
    /// Threads currently holding this lock. Mirror of the per-thread held
    /// sequences, maintained under the registry lock so destroy can detect
    /// in-use without touching other threads' state.
    pub(crate) holders: FxHashSet<ThreadId>,
    /// Tombstone: the lock was destroyed but its order evidence is kept.
    pub(crate) destroyed: bool,
}

impl LockRecord {
    fn new(kind: LockKind) -> Self {
        LockRecord {
            kind,
            created_at: Utc::now(),
            before: FxHashSet::default(),
            holders: FxHashSet::default(),
            destroyed: false,
        }
    }
}

/// Read-only snapshot of a live record, for introspection and tests.
#[derive(Debug, Clone)]
pub struct LockInfo {
    pub id: LockId,
    pub kind: LockKind,
    pub created_at: DateTime<Utc>,
    /// Sorted for deterministic comparison.
    pub before: Vec<LockId>,
    pub holders: Vec<ThreadId>,
}

/// Mapping from opaque lock address to [`LockRecord`], plus the order-graph
/// working state (see `graph.rs` for the graph half of the impl).
pub struct LockRegistry {
    pub(crate) table: FxHashMap<LockId, LockRecord>,
    pub(crate) order: OrderScratch,
}

lazy_static! {
    pub(crate) static ref GLOBAL_REGISTRY: Mutex<LockRegistry> = Mutex::new(LockRegistry::new());
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LockRegistry {
    pub fn new() -> Self {
        LockRegistry {
            table: FxHashMap::default(),
            order: OrderScratch::new(),
        }
    }

    /// Create-on-first-use registration. Succeeds whether or not a record
    /// already exists; a tombstoned record is re-initialized fresh, since
    /// the host library permits reusing destroyed lock storage.
    pub fn optional_init(&mut self, id: LockId, kind: LockKind) -> InitOutcome {
        match self.table.entry(id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().destroyed {
                    // The reborn record has no incoming edges; cached paths
                    // through the old one are gone.
                    occupied.insert(LockRecord::new(kind));
                    self.order.invalidate();
                    InitOutcome::Created
                } else {
                    InitOutcome::AlreadyPresent
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(LockRecord::new(kind));
                InitOutcome::Created
            }
        }
    }

    /// Init from an explicit init wrapper. `AlreadyPresent` on a live record
    /// means the caller double-initialized; the existing record and its
    /// order evidence are retained, only the kind is refreshed.
    pub fn explicit_init(&mut self, id: LockId, kind: LockKind) -> InitOutcome {
        match self.table.entry(id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().destroyed {
                    occupied.insert(LockRecord::new(kind));
                    self.order.invalidate();
                    InitOutcome::Created
                } else {
                    occupied.get_mut().kind = kind;
                    InitOutcome::AlreadyPresent
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(LockRecord::new(kind));
                InitOutcome::Created
            }
        }
    }

    /// Remove a lock from the registry.
    ///
    /// `NotFound` when no live record exists; benign for locks that were
    /// statically initialized and never used. `Busy` while any thread still
    /// holds the lock; the record is untouched. A record that carries order
    /// evidence (incoming edges, or referenced from another record's
    /// before-set) is tombstoned instead of removed, so reported inversions
    /// stay discoverable.
    pub fn destroy(&mut self, id: LockId) -> Result<(), LockError> {
        let Some(record) = self.table.get(&id) else {
            return Err(LockError::NotFound);
        };
        if record.destroyed {
            return Err(LockError::NotFound);
        }
        if !record.holders.is_empty() {
            return Err(LockError::Busy);
        }
        let has_evidence = !record.before.is_empty()
            || self
                .table
                .iter()
                .any(|(&other, rec)| other != id && rec.before.contains(&id));
        if has_evidence {
            if let Some(record) = self.table.get_mut(&id) {
                record.destroyed = true;
            }
        } else {
            self.table.remove(&id);
        }
        Ok(())
    }

    /// Snapshot of a live record. Destroyed records are not found.
    pub fn lookup(&self, id: LockId) -> Option<LockInfo> {
        self.table.get(&id).filter(|r| !r.destroyed).map(|r| {
            let mut before: Vec<LockId> = r.before.iter().copied().collect();
            before.sort_unstable();
            let mut holders: Vec<ThreadId> = r.holders.iter().copied().collect();
            holders.sort_unstable();
            LockInfo {
                id,
                kind: r.kind,
                created_at: r.created_at,
                before,
                holders,
            }
        })
    }

    pub(crate) fn kind_of(&self, id: LockId) -> Option<LockKind> {
        self.table.get(&id).filter(|r| !r.destroyed).map(|r| r.kind)
    }

    pub(crate) fn note_acquired(&mut self, id: LockId, thread: ThreadId) {
        if let Some(record) = self.table.get_mut(&id) {
            record.holders.insert(thread);
        }
    }

    pub(crate) fn note_released(&mut self, id: LockId, thread: ThreadId) {
        if let Some(record) = self.table.get_mut(&id) {
            record.holders.remove(&thread);
        }
    }

    /// Drop every holder mark left by an exiting thread.
    pub(crate) fn purge_thread(&mut self, thread: ThreadId, held: &[LockId]) {
        for &id in held {
            self.note_released(id, thread);
        }
    }
}

/// Snapshot a live record from the global registry.
pub fn lock_info(id: LockId) -> Option<LockInfo> {
    GLOBAL_REGISTRY.lock().lookup(id)
}
