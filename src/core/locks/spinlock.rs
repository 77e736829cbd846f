//! Library-native tracked spin lock.

use crate::core::hooks;
use crate::core::locks::raw::RawSpinLock;
use crate::core::thread_state::current_thread_id;
use crate::core::types::{LockError, LockId, LockKind};

/// A busy-waiting lock observed by the checker, tracked with
/// [`LockKind::Spin`] so inversions name it a spin lock. Same identity
/// rules as [`Mutex`](crate::Mutex): the address is the id, so keep it
/// pinned once used. Unlike the host library's spin lock, self-relock
/// returns `Deadlock` instead of spinning forever.
pub struct SpinLock {
    raw: RawSpinLock,
}

impl SpinLock {
    pub const fn new() -> Self {
        SpinLock {
            raw: RawSpinLock::new(),
        }
    }

    /// The opaque id this spin lock is tracked under.
    pub fn id(&self) -> LockId {
        self as *const SpinLock as usize
    }

    pub fn lock(&self) -> Result<(), LockError> {
        let id = self.id();
        hooks::pre_lock(id, LockKind::Spin)?;
        let result = self.raw.lock(current_thread_id());
        hooks::post_lock(id, result.map_or_else(|e| e.errno(), |_| 0));
        result
    }

    pub fn try_lock(&self) -> Result<(), LockError> {
        let id = self.id();
        hooks::pre_lock(id, LockKind::Spin)?;
        let result = self.raw.try_lock(current_thread_id());
        hooks::post_lock(id, result.map_or_else(|e| e.errno(), |_| 0));
        result
    }

    pub fn unlock(&self) -> Result<(), LockError> {
        let id = self.id();
        let _ = hooks::pre_unlock(id);
        let result = self.raw.unlock(current_thread_id());
        if result.is_ok() {
            hooks::post_unlock(id);
        }
        result
    }

    /// Retire the spin lock from the registry. `Busy` while held.
    pub fn destroy(&self) -> Result<(), LockError> {
        hooks::destroy(self.id())
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        SpinLock::new()
    }
}

impl Drop for SpinLock {
    fn drop(&mut self) {
        let _ = hooks::destroy(self.id());
    }
}
