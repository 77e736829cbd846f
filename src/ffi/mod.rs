//! Foreign Function Interface for driving locksmith from C and C++ code.
//!
//! Two audiences: a host interposer that wraps the platform thread library
//! and brackets the real primitives with the hook exports in [`hooks`],
//! and plain C callers that want tracked locks without interposition via
//! the heap-allocated objects in [`mutex`] and [`spin`].
//!
//! All functions are unsafe since they're exposed via FFI.

pub mod hooks;
pub mod mutex;
pub mod spin;

use crate::core::report::set_error_cb;
use crate::core::types::{Diagnostic, LockError};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// C error callback: receives the errno-style code and the diagnostic
/// serialized as a JSON string (valid only for the duration of the call).
pub type ErrorCallback = extern "C" fn(code: c_int, message: *const c_char);

pub(crate) fn return_code(result: Result<(), LockError>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => e.errno(),
    }
}

fn install(callback: Option<ErrorCallback>) {
    match callback {
        Some(cb) => set_error_cb(Some(Box::new(move |diag: &Diagnostic| {
            let payload =
                serde_json::to_string(diag).unwrap_or_else(|_| diag.message.clone());
            if let Ok(message) = CString::new(payload) {
                cb(diag.code, message.as_ptr());
            }
        }))),
        None => set_error_cb(None),
    }
}

/// Initialize locksmith.
///
/// Installs the error callback. Tracking itself needs no initialization
/// (records are created on first use), so this is only required when a
/// callback is wanted before the first diagnostic.
///
/// # Returns
/// * `0` on success
/// * `1` if locksmith is already initialized
///
/// # Safety
/// `callback`, if non-NULL, must remain callable for the life of the
/// process and must not re-enter locksmith.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_init(callback: Option<ErrorCallback>) -> c_int {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return 1;
    }
    install(callback);
    0
}

/// Install or clear the error callback.
///
/// # Arguments
/// * `callback` - Function pointer to call for each diagnostic, or NULL to
///   restore the default stderr sink.
///
/// # Safety
/// Same contract as [`lksmith_init`]: the callback must outlive the
/// process and must not re-enter locksmith.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_set_error_cb(callback: Option<ErrorCallback>) {
    install(callback);
}

/// Name the calling thread for diagnostics.
///
/// # Returns
/// * `0` on success
/// * `EINVAL` if `name` is NULL or not valid UTF-8
///
/// # Safety
/// `name` must be NULL or a valid null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lksmith_set_thread_name(name: *const c_char) -> c_int {
    if name.is_null() {
        return libc::EINVAL;
    }
    match unsafe { CStr::from_ptr(name) }.to_str() {
        Ok(name) => {
            crate::core::thread_state::set_thread_name(name);
            0
        }
        Err(_) => libc::EINVAL,
    }
}
