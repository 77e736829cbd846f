//! Owner-tracking primitives underneath the library-native lock types.
//!
//! The sleep primitive layers error-checking (or recursive) semantics on
//! top of `parking_lot::RawMutex`: the owning thread id is kept in an
//! atomic next to the raw lock, which is what lets self-lock come back as
//! EDEADLK and unlock-of-unowned as EPERM instead of hanging or corrupting
//! state. The spin primitive is a compare-exchange loop with the same
//! owner bookkeeping.
//!
//! Owner ids are checker thread ids, which start at 1; 0 means unowned.

use crate::core::types::{LockError, ThreadId};
use parking_lot::RawMutex;
use parking_lot::lock_api::{RawMutex as _, RawMutexTimed as _};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) struct RawSleepLock {
    raw: RawMutex,
    owner: AtomicUsize,
    depth: AtomicUsize,
    recursive: bool,
}

impl RawSleepLock {
    pub(crate) const fn new(recursive: bool) -> Self {
        RawSleepLock {
            raw: RawMutex::INIT,
            owner: AtomicUsize::new(0),
            depth: AtomicUsize::new(0),
            recursive,
        }
    }

    fn relock_same_owner(&self, thread: ThreadId) -> Option<Result<(), LockError>> {
        if self.owner.load(Ordering::Acquire) != thread {
            return None;
        }
        if self.recursive {
            // Only the owner touches depth while the lock is held.
            self.depth.fetch_add(1, Ordering::Relaxed);
            Some(Ok(()))
        } else {
            Some(Err(LockError::Deadlock))
        }
    }

    fn acquired(&self, thread: ThreadId) {
        self.owner.store(thread, Ordering::Release);
        self.depth.store(1, Ordering::Relaxed);
    }

    pub(crate) fn lock(&self, thread: ThreadId) -> Result<(), LockError> {
        if let Some(result) = self.relock_same_owner(thread) {
            return result;
        }
        self.raw.lock();
        self.acquired(thread);
        Ok(())
    }

    pub(crate) fn try_lock(&self, thread: ThreadId) -> Result<(), LockError> {
        if let Some(result) = self.relock_same_owner(thread) {
            return result;
        }
        if self.raw.try_lock() {
            self.acquired(thread);
            Ok(())
        } else {
            Err(LockError::Busy)
        }
    }

    pub(crate) fn timed_lock(&self, thread: ThreadId, timeout: Duration) -> Result<(), LockError> {
        if let Some(result) = self.relock_same_owner(thread) {
            return result;
        }
        if self.raw.try_lock_for(timeout) {
            self.acquired(thread);
            Ok(())
        } else {
            Err(LockError::TimedOut)
        }
    }

    pub(crate) fn unlock(&self, thread: ThreadId) -> Result<(), LockError> {
        if self.owner.load(Ordering::Acquire) != thread {
            return Err(LockError::NotOwner);
        }
        if self.depth.fetch_sub(1, Ordering::Relaxed) > 1 {
            return Ok(());
        }
        self.owner.store(0, Ordering::Release);
        // Owner verified above; the raw lock is held by this thread.
        unsafe { self.raw.unlock() };
        Ok(())
    }
}

pub(crate) struct RawSpinLock {
    locked: AtomicBool,
    owner: AtomicUsize,
}

impl RawSpinLock {
    pub(crate) const fn new() -> Self {
        RawSpinLock {
            locked: AtomicBool::new(false),
            owner: AtomicUsize::new(0),
        }
    }

    pub(crate) fn lock(&self, thread: ThreadId) -> Result<(), LockError> {
        if self.owner.load(Ordering::Acquire) == thread {
            return Err(LockError::Deadlock);
        }
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                std::hint::spin_loop();
            }
        }
        self.owner.store(thread, Ordering::Release);
        Ok(())
    }

    pub(crate) fn try_lock(&self, thread: ThreadId) -> Result<(), LockError> {
        if self.owner.load(Ordering::Acquire) == thread {
            return Err(LockError::Deadlock);
        }
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.owner.store(thread, Ordering::Release);
            Ok(())
        } else {
            Err(LockError::Busy)
        }
    }

    pub(crate) fn unlock(&self, thread: ThreadId) -> Result<(), LockError> {
        if self.owner.load(Ordering::Acquire) != thread {
            return Err(LockError::NotOwner);
        }
        self.owner.store(0, Ordering::Release);
        self.locked.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_checking_self_lock_is_deadlock() {
        let raw = RawSleepLock::new(false);
        assert_eq!(raw.lock(1), Ok(()));
        assert_eq!(raw.lock(1), Err(LockError::Deadlock));
        assert_eq!(raw.try_lock(1), Err(LockError::Deadlock));
        assert_eq!(raw.unlock(1), Ok(()));
    }

    #[test]
    fn recursive_relock_and_release() {
        let raw = RawSleepLock::new(true);
        assert_eq!(raw.lock(1), Ok(()));
        assert_eq!(raw.lock(1), Ok(()));
        assert_eq!(raw.unlock(1), Ok(()));
        // Still held after the partial release.
        assert_eq!(raw.try_lock(2), Err(LockError::Busy));
        assert_eq!(raw.unlock(1), Ok(()));
        assert_eq!(raw.try_lock(2), Ok(()));
        assert_eq!(raw.unlock(2), Ok(()));
    }

    #[test]
    fn unlock_by_non_owner_is_rejected() {
        let raw = RawSleepLock::new(false);
        assert_eq!(raw.unlock(1), Err(LockError::NotOwner));
        assert_eq!(raw.lock(1), Ok(()));
        assert_eq!(raw.unlock(2), Err(LockError::NotOwner));
        assert_eq!(raw.unlock(1), Ok(()));
    }

    #[test]
    fn timed_lock_times_out_while_contended() {
        let raw = RawSleepLock::new(false);
        assert_eq!(raw.lock(1), Ok(()));
        assert_eq!(
            raw.timed_lock(2, Duration::from_millis(10)),
            Err(LockError::TimedOut)
        );
        assert_eq!(raw.unlock(1), Ok(()));
        assert_eq!(raw.timed_lock(2, Duration::from_millis(10)), Ok(()));
        assert_eq!(raw.unlock(2), Ok(()));
    }

    #[test]
    fn spin_lock_basics() {
        let raw = RawSpinLock::new();
        assert_eq!(raw.lock(1), Ok(()));
        assert_eq!(raw.lock(1), Err(LockError::Deadlock));
        assert_eq!(raw.try_lock(2), Err(LockError::Busy));
        assert_eq!(raw.unlock(2), Err(LockError::NotOwner));
        assert_eq!(raw.unlock(1), Ok(()));
        assert_eq!(raw.try_lock(2), Ok(()));
        assert_eq!(raw.unlock(2), Ok(()));
    }
}
