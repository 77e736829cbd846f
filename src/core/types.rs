use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lock & thread identifier types.
///
/// A `LockId` is the address of the caller's lock object, used as an opaque
/// token; it is never dereferenced. A `ThreadId` is a process-local id
/// assigned the first time a thread touches the checker.
pub type LockId = usize;
pub type ThreadId = usize;

/// Flavor of a tracked lock. Only affects diagnostic text; the order graph
/// treats both the same.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LockKind {
    /// A sleeping lock (mutex).
    Sleep,
    /// A busy-waiting lock (spin lock).
    Spin,
}

impl LockKind {
    /// Human-readable noun for diagnostic messages.
    pub fn noun(self) -> &'static str {
        match self {
            LockKind::Sleep => "mutex",
            LockKind::Spin => "spin lock",
        }
    }
}

/// Errors surfaced by lock operations and registry maintenance.
///
/// Each variant maps onto the canonical errno value the host thread library
/// would return for the same condition, so wrappers stay transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
    /// Acquisition would deadlock (self-lock of an error-checking mutex).
    #[error("resource deadlock would occur")]
    Deadlock,
    /// The calling thread does not own the lock.
    #[error("lock not owned by the calling thread")]
    NotOwner,
    /// The lock is held by another thread, or destroy was attempted on a
    /// lock some thread still holds.
    #[error("lock is busy")]
    Busy,
    /// A timed acquisition ran out of time.
    #[error("timed out waiting for lock")]
    TimedOut,
    /// No live record for the given lock id.
    #[error("no such lock")]
    NotFound,
    /// Malformed argument (null id, unknown kind or mutex type).
    #[error("invalid argument")]
    InvalidArg,
}

impl LockError {
    /// The errno value reported to C callers and carried in diagnostics.
    pub fn errno(self) -> i32 {
        match self {
            LockError::Deadlock => libc::EDEADLK,
            LockError::NotOwner => libc::EPERM,
            LockError::Busy => libc::EBUSY,
            LockError::TimedOut => libc::ETIMEDOUT,
            LockError::NotFound => libc::ENOENT,
            LockError::InvalidArg => libc::EINVAL,
        }
    }
}

/// A single emitted diagnostic, as delivered to the error callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Errno-style code (EDEADLK for inversions, EPERM for bad unlocks, ...).
    pub code: i32,
    /// Bounded human-readable description.
    pub message: String,
    /// Thread the diagnostic originated on.
    pub thread: ThreadId,
    /// Name of that thread, if one was recorded.
    pub thread_name: Option<String>,
    /// Lock ids involved. For an inversion this is the full ordering path,
    /// acquired lock first, conflicting held lock last.
    pub locks: Vec<LockId>,
    /// Timestamp when the diagnostic was produced.
    pub timestamp: String,
}

impl Diagnostic {
    pub(crate) fn new(
        code: i32,
        thread: ThreadId,
        thread_name: Option<String>,
        locks: Vec<LockId>,
        message: String,
    ) -> Self {
        Diagnostic {
            code,
            message,
            thread,
            thread_name,
            locks,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
