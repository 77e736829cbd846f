//! Library-native tracked mutex.

use crate::core::attr::{MutexAttr, MutexType, effective_type};
use crate::core::hooks;
use crate::core::locks::raw::RawSleepLock;
use crate::core::thread_state::current_thread_id;
use crate::core::types::{LockError, LockId, LockKind};
use std::time::Duration;

/// A mutex whose every operation is observed by the lock-order checker,
/// usable without the interposer. The mutex is identified by its address;
/// registration happens by optional-init on first use, which is what makes
/// `const fn new` a working static initializer:
///
/// ```
/// use locksmith::Mutex;
///
/// static LOCK: Mutex = Mutex::new();
///
/// LOCK.lock().unwrap();
/// LOCK.unlock().unwrap();
/// ```
///
/// Operations return the canonical error for the condition: `Deadlock`
/// (EDEADLK) on self-lock, `NotOwner` (EPERM) on unlock-of-unowned, `Busy`
/// (EBUSY) on a contended try_lock, `TimedOut` (ETIMEDOUT) on timed_lock
/// expiry. Because the address is the identity, a mutex must stay put
/// between its first lock and its destruction: keep it in a `static`, an
/// `Arc`, or any other pinned home.
pub struct Mutex {
    raw: RawSleepLock,
}

impl Mutex {
    /// An error-checking mutex, per the upgrade policy for a missing
    /// attribute set. Const: usable as a static initializer.
    pub const fn new() -> Self {
        Mutex {
            raw: RawSleepLock::new(false),
        }
    }

    /// A mutex with caller-supplied attributes, run through the upgrade
    /// policy: every type except `Recursive` comes out error-checking.
    pub fn with_attr(attr: &MutexAttr) -> Self {
        let recursive = effective_type(Some(attr)) == MutexType::Recursive;
        Mutex {
            raw: RawSleepLock::new(recursive),
        }
    }

    /// The opaque id this mutex is tracked under.
    pub fn id(&self) -> LockId {
        self as *const Mutex as usize
    }

    /// Acquire, blocking if necessary.
    pub fn lock(&self) -> Result<(), LockError> {
        let id = self.id();
        hooks::pre_lock(id, LockKind::Sleep)?;
        let result = self.raw.lock(current_thread_id());
        hooks::post_lock(id, result.map_or_else(|e| e.errno(), |_| 0));
        result
    }

    /// Acquire without blocking; `Busy` if another thread holds the lock.
    pub fn try_lock(&self) -> Result<(), LockError> {
        let id = self.id();
        hooks::pre_lock(id, LockKind::Sleep)?;
        let result = self.raw.try_lock(current_thread_id());
        hooks::post_lock(id, result.map_or_else(|e| e.errno(), |_| 0));
        result
    }

    /// Acquire, giving up after `timeout`.
    pub fn timed_lock(&self, timeout: Duration) -> Result<(), LockError> {
        let id = self.id();
        hooks::pre_lock(id, LockKind::Sleep)?;
        let result = self.raw.timed_lock(current_thread_id(), timeout);
        hooks::post_lock(id, result.map_or_else(|e| e.errno(), |_| 0));
        result
    }

    /// Release. The real unlock is attempted even when the checker believes
    /// the caller does not hold the lock, so the returned code is always
    /// the primitive's own.
    pub fn unlock(&self) -> Result<(), LockError> {
        let id = self.id();
        let _ = hooks::pre_unlock(id);
        let result = self.raw.unlock(current_thread_id());
        if result.is_ok() {
            hooks::post_unlock(id);
        }
        result
    }

    /// Retire the mutex from the registry. `Busy` while any thread holds
    /// it. Dropping the mutex does this implicitly.
    pub fn destroy(&self) -> Result<(), LockError> {
        hooks::destroy(self.id())
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Mutex::new()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        // Benign when the mutex was never used or already destroyed.
        let _ = hooks::destroy(self.id());
    }
}
