//! Per-thread held-lock state.
//!
//! Each thread owns its held sequence through a thread-local slot; no lock
//! guards it. A process-wide thread table exists only for enumeration and
//! teardown, guarded by its own mutex (`thread_table_lock` in the
//! concurrency model). Steady-state lock operations never touch the table.

use crate::core::registry::GLOBAL_REGISTRY;
use crate::core::types::{LockError, LockId, LockKind, ThreadId};
use chrono::{DateTime, Utc};
use fxhash::FxHashMap;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(1);

lazy_static! {
    static ref THREAD_TABLE: Mutex<FxHashMap<ThreadId, Option<String>>> =
        Mutex::new(FxHashMap::default());
}

thread_local! {
    static CURRENT: RefCell<ThreadState> = RefCell::new(ThreadState::register());
}

/// One element of a thread's held sequence.
#[derive(Debug, Clone)]
pub struct HeldEntry {
    pub lock: LockId,
    pub kind: LockKind,
    /// Recursion depth; 1 for everything except a recursive mutex that was
    /// re-acquired. The held sequence never lists the same lock twice.
    pub depth: usize,
    pub acquired_at: DateTime<Utc>,
}

/// Held sequence and identity of one thread. Created lazily on the first
/// per-thread operation; deregistered when the thread exits.
pub(crate) struct ThreadState {
    id: ThreadId,
    name: Option<String>,
    held: Vec<HeldEntry>,
}

impl ThreadState {
    fn register() -> Self {
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        let name = std::thread::current().name().map(str::to_owned);
        THREAD_TABLE.lock().insert(id, name.clone());
        ThreadState {
            id,
            name,
            held: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> ThreadId {
        self.id
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn find_mut(&mut self, lock: LockId) -> Option<&mut HeldEntry> {
        self.held.iter_mut().find(|entry| entry.lock == lock)
    }

    pub(crate) fn contains(&self, lock: LockId) -> bool {
        self.held.iter().any(|entry| entry.lock == lock)
    }

    /// Record a successful acquisition: append to the held sequence, or
    /// bump the depth on a recursive re-acquire.
    pub(crate) fn push(&mut self, lock: LockId, kind: LockKind) {
        if let Some(entry) = self.find_mut(lock) {
            entry.depth += 1;
            return;
        }
        self.held.push(HeldEntry {
            lock,
            kind,
            depth: 1,
            acquired_at: Utc::now(),
        });
    }

    /// Record a successful release. The lock may sit anywhere in the held
    /// sequence, not only at the top. Returns `Ok(true)` when the entry was
    /// fully released (depth reached zero), `Ok(false)` on a recursive
    /// partial release.
    pub(crate) fn pop(&mut self, lock: LockId) -> Result<bool, LockError> {
        let Some(entry) = self.find_mut(lock) else {
            return Err(LockError::NotOwner);
        };
        if entry.depth > 1 {
            entry.depth -= 1;
            return Ok(false);
        }
        self.held.retain(|entry| entry.lock != lock);
        Ok(true)
    }

    pub(crate) fn held_snapshot(&self) -> Vec<LockId> {
        self.held.iter().map(|entry| entry.lock).collect()
    }
}

impl Drop for ThreadState {
    fn drop(&mut self) {
        {
            THREAD_TABLE.lock().remove(&self.id);
        }
        // Natural cleanup for a thread that exited with locks held: clear
        // its holder marks so destroy does not stay EBUSY forever.
        if !self.held.is_empty() {
            let held = self.held_snapshot();
            GLOBAL_REGISTRY.lock().purge_thread(self.id, &held);
        }
    }
}

/// Run `f` against the calling thread's state, creating it on first use.
pub(crate) fn with_current<R>(f: impl FnOnce(&mut ThreadState) -> R) -> R {
    CURRENT.with(|state| f(&mut state.borrow_mut()))
}

pub(crate) fn current_thread_id() -> ThreadId {
    with_current(|state| state.id())
}

/// Name the calling thread for diagnostics. Overrides any name inherited
/// from the OS thread.
pub fn set_thread_name(name: impl Into<String>) {
    let name = name.into();
    let id = with_current(|state| {
        state.name = Some(name.clone());
        state.id()
    });
    THREAD_TABLE.lock().insert(id, Some(name));
}

/// Enumerate threads the checker has seen and not yet torn down.
pub fn tracked_threads() -> Vec<(ThreadId, Option<String>)> {
    let table = THREAD_TABLE.lock();
    let mut threads: Vec<_> = table.iter().map(|(&id, name)| (id, name.clone())).collect();
    threads.sort_unstable_by_key(|&(id, _)| id);
    threads
}

/// Locks currently held by the calling thread, acquisition order preserved.
pub fn held_locks() -> Vec<LockId> {
    with_current(|state| state.held_snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ThreadState {
        ThreadState {
            id: 1,
            name: None,
            held: Vec::new(),
        }
    }

    #[test]
    fn push_and_pop_round_trip() {
        let mut ts = state();
        ts.push(10, LockKind::Sleep);
        ts.push(20, LockKind::Spin);
        assert_eq!(ts.held_snapshot(), vec![10, 20]);

        assert_eq!(ts.pop(10), Ok(true));
        assert_eq!(ts.held_snapshot(), vec![20]);
        assert_eq!(ts.pop(20), Ok(true));
        assert!(ts.held_snapshot().is_empty());
        // Drop runs against the global registry; give it nothing to purge.
        assert!(!ts.contains(10));
    }

    #[test]
    fn pop_of_unheld_lock_signals_not_owner() {
        let mut ts = state();
        assert_eq!(ts.pop(10), Err(LockError::NotOwner));
    }

    #[test]
    fn recursive_reacquire_bumps_depth_without_duplicates() {
        let mut ts = state();
        ts.push(10, LockKind::Sleep);
        ts.push(10, LockKind::Sleep);
        assert_eq!(ts.held_snapshot(), vec![10]);

        assert_eq!(ts.pop(10), Ok(false));
        assert!(ts.contains(10));
        assert_eq!(ts.pop(10), Ok(true));
        assert!(!ts.contains(10));
    }
}
