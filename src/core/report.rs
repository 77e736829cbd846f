//! Process-wide error-callback store.
//!
//! Diagnostics flow through a single installable callback. When none is
//! installed, a default sink writes them to standard error. The callback is
//! invoked with no internal lock held, but it must still not re-enter
//! locksmith: lock operations performed inside the callback would recurse
//! into the very bookkeeping that produced the diagnostic.

use crate::core::types::Diagnostic;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Upper bound on the length of a diagnostic message, in bytes.
pub const ERROR_MESSAGE_MAX: usize = 1024;

type ErrorCb = Arc<dyn Fn(&Diagnostic) + Send + Sync + 'static>;

lazy_static! {
    // Leaf lock: nothing else is acquired while this is held.
    static ref ERROR_CB: Mutex<Option<ErrorCb>> = Mutex::new(None);
}

/// Install or clear the process-wide error callback. Thread-safe; replaces
/// any previously installed callback.
pub fn set_error_cb(cb: Option<Box<dyn Fn(&Diagnostic) + Send + Sync + 'static>>) {
    *ERROR_CB.lock() = cb.map(ErrorCb::from);
}

/// Deliver a diagnostic to the installed callback, or to stderr when none
/// is installed. The message is truncated to [`ERROR_MESSAGE_MAX`] bytes.
pub(crate) fn report(mut diag: Diagnostic) {
    bound_message(&mut diag.message);
    let cb = ERROR_CB.lock().clone();
    match cb {
        Some(cb) => cb(&diag),
        None => {
            let _ = writeln!(
                std::io::stderr(),
                "locksmith: error {}: {}",
                diag.code,
                diag.message
            );
        }
    }
}

fn bound_message(message: &mut String) {
    if message.len() <= ERROR_MESSAGE_MAX {
        return;
    }
    let mut end = ERROR_MESSAGE_MAX;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message.truncate(end);
}
