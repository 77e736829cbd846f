//! Heap-allocated tracked spin locks for C callers.

use crate::core::locks::SpinLock;
use crate::ffi::return_code;
use std::ffi::c_void;
use std::os::raw::c_int;

/// Create a new tracked spin lock.
///
/// # Returns
/// * Void pointer to the spin lock
///
/// # Safety
/// The returned pointer is a heap allocation and must be freed with
/// [`lksmith_spin_destroy`]; it must not be freed or moved by other means.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_spin_create() -> *mut c_void {
    Box::into_raw(Box::new(SpinLock::new())) as *mut c_void
}

/// Destroy a tracked spin lock and free its memory.
///
/// # Safety
/// * `spin` must have come from [`lksmith_spin_create`].
/// * No thread may use the pointer after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_spin_destroy(spin: *mut c_void) {
    if !spin.is_null() {
        unsafe {
            drop(Box::from_raw(spin as *mut SpinLock));
        }
    }
}

/// Lock a tracked spin lock, spinning until it is available.
///
/// # Returns
/// * `0` on success
/// * `EDEADLK` if the calling thread already holds it
/// * `EINVAL` if the pointer is NULL
///
/// # Safety
/// `spin` must be a valid pointer from [`lksmith_spin_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_spin_lock(spin: *mut c_void) -> c_int {
    if spin.is_null() {
        return libc::EINVAL;
    }
    let spin = unsafe { &*(spin as *const SpinLock) };
    return_code(spin.lock())
}

/// Try to lock a tracked spin lock without spinning.
///
/// # Returns
/// * `0` on success, `EBUSY` if another thread holds it
/// * `EDEADLK` / `EINVAL` as for [`lksmith_spin_lock`]
///
/// # Safety
/// `spin` must be a valid pointer from [`lksmith_spin_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_spin_trylock(spin: *mut c_void) -> c_int {
    if spin.is_null() {
        return libc::EINVAL;
    }
    let spin = unsafe { &*(spin as *const SpinLock) };
    return_code(spin.try_lock())
}

/// Unlock a tracked spin lock.
///
/// # Returns
/// * `0` on success
/// * `EPERM` if the calling thread does not hold it
/// * `EINVAL` if the pointer is NULL
///
/// # Safety
/// `spin` must be a valid pointer from [`lksmith_spin_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_spin_unlock(spin: *mut c_void) -> c_int {
    if spin.is_null() {
        return libc::EINVAL;
    }
    let spin = unsafe { &*(spin as *const SpinLock) };
    return_code(spin.unlock())
}
