//! The hook contract exported for a host interposer.
//!
//! The interposer wraps each thread-library entry point, resolves the real
//! primitive through its loader's next-symbol lookup, and brackets the
//! real call with these hooks, passing the caller's lock pointer as the
//! opaque id. Lock kinds on this boundary: `0` = mutex, `1` = spin lock.

use crate::core::attr::MutexType;
use crate::core::hooks;
use crate::core::types::LockKind;
use crate::ffi::return_code;
use std::ffi::c_void;
use std::os::raw::c_int;

pub const LKSMITH_KIND_MUTEX: c_int = 0;
pub const LKSMITH_KIND_SPIN: c_int = 1;

fn kind_from(kind: c_int) -> Option<LockKind> {
    match kind {
        LKSMITH_KIND_MUTEX => Some(LockKind::Sleep),
        LKSMITH_KIND_SPIN => Some(LockKind::Spin),
        _ => None,
    }
}

/// Admission check; call before the real lock/trylock/timedlock.
///
/// Emits an EDEADLK diagnostic for every ordering inversion the
/// acquisition would introduce; never vetoes the acquisition itself.
///
/// # Returns
/// * `0` to proceed
/// * `EINVAL` if `id` is NULL or `kind` is unknown
///
/// # Safety
/// `id` is used purely as an address token and is never dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_pre_lock(id: *const c_void, kind: c_int) -> c_int {
    if id.is_null() {
        return libc::EINVAL;
    }
    let Some(kind) = kind_from(kind) else {
        return libc::EINVAL;
    };
    return_code(hooks::pre_lock(id as usize, kind))
}

/// Completion; call after the real acquisition with its return code.
///
/// # Safety
/// `id` is used purely as an address token and is never dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_post_lock(id: *const c_void, real_code: c_int) {
    if id.is_null() {
        return;
    }
    hooks::post_lock(id as usize, real_code);
}

/// Ownership check; call before the real unlock. The wrapper should call
/// the real unlock regardless of the result and propagate the real code.
///
/// # Returns
/// * `0` when the calling thread holds the lock
/// * `EPERM` (also reported through the callback) when it does not
/// * `EINVAL` if `id` is NULL
///
/// # Safety
/// `id` is used purely as an address token and is never dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_pre_unlock(id: *const c_void) -> c_int {
    if id.is_null() {
        return libc::EINVAL;
    }
    return_code(hooks::pre_unlock(id as usize))
}

/// Removal from the held sequence; call only after a successful real
/// unlock.
///
/// # Safety
/// `id` is used purely as an address token and is never dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_post_unlock(id: *const c_void) {
    if id.is_null() {
        return;
    }
    hooks::post_unlock(id as usize);
}

/// Create-on-first-use registration, for wrappers that cannot tell whether
/// the lock was statically initialized. Idempotent.
///
/// # Safety
/// `id` is used purely as an address token and is never dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_optional_init(id: *const c_void, kind: c_int) -> c_int {
    if id.is_null() {
        return libc::EINVAL;
    }
    let Some(kind) = kind_from(kind) else {
        return libc::EINVAL;
    };
    hooks::optional_init(id as usize, kind);
    0
}

/// Registration from an init wrapper. Double-init of a live lock is
/// reported (EINVAL diagnostic) but tolerated.
///
/// # Safety
/// `id` is used purely as an address token and is never dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_explicit_init(id: *const c_void, kind: c_int) -> c_int {
    if id.is_null() {
        return libc::EINVAL;
    }
    let Some(kind) = kind_from(kind) else {
        return libc::EINVAL;
    };
    return_code(hooks::explicit_init(id as usize, kind))
}

/// Deregistration from a destroy wrapper.
///
/// # Returns
/// * `0` on success
/// * `EBUSY` (reported) while some thread still holds the lock
/// * `ENOENT` for an unknown lock; benign for statically initialized locks
///   that never saw an operation
/// * `EINVAL` if `id` is NULL
///
/// # Safety
/// `id` is used purely as an address token and is never dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_destroy(id: *const c_void) -> c_int {
    if id.is_null() {
        return libc::EINVAL;
    }
    return_code(hooks::destroy(id as usize))
}

/// The mutex-type upgrade policy over the platform's `PTHREAD_MUTEX_*`
/// constants: types compatible with error checking come back as
/// `PTHREAD_MUTEX_ERRORCHECK`; recursive and already-error-checking types
/// come back unchanged.
///
/// # Returns
/// The type to initialize the mutex with, or `-1` for an unknown type.
#[unsafe(no_mangle)]
pub extern "C" fn lksmith_upgrade_mutex_type(mutex_type: c_int) -> c_int {
    let parsed = if mutex_type == libc::PTHREAD_MUTEX_ERRORCHECK {
        MutexType::ErrorCheck
    } else if mutex_type == libc::PTHREAD_MUTEX_RECURSIVE {
        MutexType::Recursive
    } else if mutex_type == libc::PTHREAD_MUTEX_NORMAL {
        // PTHREAD_MUTEX_DEFAULT aliases PTHREAD_MUTEX_NORMAL on the
        // platforms we care about.
        MutexType::Normal
    } else {
        #[cfg(target_os = "linux")]
        if mutex_type == libc::PTHREAD_MUTEX_ADAPTIVE_NP {
            return to_pthread_type(MutexType::Adaptive.upgrade());
        }
        return -1;
    };
    to_pthread_type(parsed.upgrade())
}

fn to_pthread_type(mutex_type: MutexType) -> c_int {
    match mutex_type {
        MutexType::ErrorCheck => libc::PTHREAD_MUTEX_ERRORCHECK,
        MutexType::Recursive => libc::PTHREAD_MUTEX_RECURSIVE,
        _ => libc::PTHREAD_MUTEX_NORMAL,
    }
}
