//! # Locksmith
//!
//! A runtime lock-ordering checker for native-threads programs.
//!
//! Locksmith observes every lock acquisition and builds a per-process
//! directed graph whose nodes are locks and whose edges record the
//! "held-while-acquiring" relation. Any acquisition that would close a
//! cycle in that graph is diagnosed as a potential deadlock (an AB-BA
//! inversion) before the real acquisition is attempted; the acquisition
//! still proceeds, so program semantics are unchanged. Where the declared
//! mutex type allows it, ordinary mutexes are upgraded to error-checking
//! ones, so self-deadlock comes back as EDEADLK and unlock-of-unowned as
//! EPERM instead of hanging or silently corrupting state.
//!
//! ## Overview
//!
//! AB-BA inversions are the classic latent deadlock: two locks taken in
//! opposite orders on two code paths, harmless until the day both paths
//! run at once. Locksmith catches the inversion the first time the orders
//! disagree, whether or not the program actually hangs.
//!
//! Diagnostics flow through an installable error callback; with no
//! callback installed they are written to stderr. A host interposer can
//! drive the same machinery for an unmodified program through the exported
//! [`ffi`] hooks.
//!
//! ## Usage Example
//!
//! ```rust
//! use locksmith::{Locksmith, Mutex};
//! use std::sync::Arc;
//!
//! Locksmith::new()
//!     .callback(|diag| {
//!         eprintln!("lock trouble ({}): {}", diag.code, diag.message);
//!     })
//!     .start()
//!     .expect("failed to start checker");
//!
//! let account = Arc::new(Mutex::new());
//! let journal = Arc::new(Mutex::new());
//!
//! // Consistent order: account before journal. No diagnostics.
//! account.lock().unwrap();
//! journal.lock().unwrap();
//! journal.unlock().unwrap();
//! account.unlock().unwrap();
//! ```

mod core;
pub use core::{
    Diagnostic, ERROR_MESSAGE_MAX, HeldEntry, LockError, LockInfo, Locksmith, Mutex, MutexAttr,
    MutexType, SpinLock, effective_type, held_locks, lock_info, set_error_cb, set_thread_name,
    tracked_threads,
    types::{LockId, LockKind, ThreadId},
};

pub mod ffi;

/// The pre/post hook contract, public for wrappers built outside this
/// crate (the FFI layer exports the same functions with C linkage).
pub mod hooks {
    pub use crate::core::hooks::{
        destroy, explicit_init, optional_init, post_lock, post_unlock, pre_lock, pre_unlock,
    };
}
