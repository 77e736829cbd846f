//! Heap-allocated tracked mutexes for C callers.

use crate::core::locks::Mutex;
use crate::ffi::return_code;
use std::ffi::c_void;
use std::os::raw::{c_int, c_ulonglong};
use std::time::Duration;

/// Create a new tracked mutex (error-checking, per the upgrade policy).
///
/// # Returns
/// * Void pointer to the mutex
///
/// # Safety
/// The returned pointer is a heap allocation and must be freed with
/// [`lksmith_mutex_destroy`]; it must not be freed or moved by other means.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_mutex_create() -> *mut c_void {
    Box::into_raw(Box::new(Mutex::new())) as *mut c_void
}

/// Destroy a tracked mutex and free its memory.
///
/// # Safety
/// * `mutex` must have come from [`lksmith_mutex_create`].
/// * No thread may use the pointer after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_mutex_destroy(mutex: *mut c_void) {
    if !mutex.is_null() {
        unsafe {
            drop(Box::from_raw(mutex as *mut Mutex));
        }
    }
}

/// Lock a tracked mutex, blocking if necessary.
///
/// # Returns
/// * `0` on success
/// * `EDEADLK` if the calling thread already holds the mutex
/// * `EINVAL` if the pointer is NULL
///
/// # Safety
/// `mutex` must be a valid pointer from [`lksmith_mutex_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_mutex_lock(mutex: *mut c_void) -> c_int {
    if mutex.is_null() {
        return libc::EINVAL;
    }
    let mutex = unsafe { &*(mutex as *const Mutex) };
    return_code(mutex.lock())
}

/// Try to lock a tracked mutex without blocking.
///
/// # Returns
/// * `0` on success, `EBUSY` if another thread holds it
/// * `EDEADLK` / `EINVAL` as for [`lksmith_mutex_lock`]
///
/// # Safety
/// `mutex` must be a valid pointer from [`lksmith_mutex_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_mutex_trylock(mutex: *mut c_void) -> c_int {
    if mutex.is_null() {
        return libc::EINVAL;
    }
    let mutex = unsafe { &*(mutex as *const Mutex) };
    return_code(mutex.try_lock())
}

/// Lock a tracked mutex, giving up after `timeout_ms` milliseconds.
///
/// # Returns
/// * `0` on success, `ETIMEDOUT` on expiry
/// * `EDEADLK` / `EINVAL` as for [`lksmith_mutex_lock`]
///
/// # Safety
/// `mutex` must be a valid pointer from [`lksmith_mutex_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_mutex_timedlock(
    mutex: *mut c_void,
    timeout_ms: c_ulonglong,
) -> c_int {
    if mutex.is_null() {
        return libc::EINVAL;
    }
    let mutex = unsafe { &*(mutex as *const Mutex) };
    return_code(mutex.timed_lock(Duration::from_millis(timeout_ms)))
}

/// Unlock a tracked mutex.
///
/// # Returns
/// * `0` on success
/// * `EPERM` if the calling thread does not hold the mutex
/// * `EINVAL` if the pointer is NULL
///
/// # Safety
/// `mutex` must be a valid pointer from [`lksmith_mutex_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_mutex_unlock(mutex: *mut c_void) -> c_int {
    if mutex.is_null() {
        return libc::EINVAL;
    }
    let mutex = unsafe { &*(mutex as *const Mutex) };
    return_code(mutex.unlock())
}
