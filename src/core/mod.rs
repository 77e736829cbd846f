// Core types
pub mod types;
pub use types::*;

// Error-callback store
pub mod report;
pub use report::{ERROR_MESSAGE_MAX, set_error_cb};

// Lock registry and the order graph over it
pub mod registry;
pub use registry::{LockInfo, lock_info};
pub mod graph;

// Per-thread held state
pub mod thread_state;
pub use thread_state::{HeldEntry, held_locks, set_thread_name, tracked_threads};

// Pre/post hook contract for wrappers
pub mod hooks;

// Mutex attribute upgrade policy
pub mod attr;
pub use attr::{MutexAttr, MutexType, effective_type};

// Library-native tracked locks
pub mod locks;
pub use locks::{Mutex, SpinLock};

use anyhow::{Result, bail};
use std::sync::atomic::{AtomicBool, Ordering};

static STARTED: AtomicBool = AtomicBool::new(false);

/// Locksmith configuration builder.
pub struct Locksmith {
    callback: Option<Box<dyn Fn(&Diagnostic) + Send + Sync + 'static>>,
    thread_name: Option<String>,
}

impl Default for Locksmith {
    fn default() -> Self {
        Self::new()
    }
}

impl Locksmith {
    /// Create a new builder with default settings.
    ///
    /// By default no callback is installed, so diagnostics go to the
    /// stderr sink.
    pub fn new() -> Self {
        Locksmith {
            callback: None,
            thread_name: None,
        }
    }

    /// Set the callback invoked for every diagnostic the checker emits.
    ///
    /// The callback must not re-enter locksmith (no tracked lock
    /// operations inside it).
    ///
    /// # Arguments
    /// * `callback` - Function to call with each emitted [`Diagnostic`]
    ///
    /// # Returns
    /// The builder for method chaining
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Name the calling thread for diagnostics.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Install the configured settings.
    ///
    /// # Errors
    /// Returns an error if the checker was already started in this
    /// process; use [`set_error_cb`] to swap the callback afterwards.
    pub fn start(self) -> Result<()> {
        if STARTED.swap(true, Ordering::SeqCst) {
            bail!("locksmith already started in this process");
        }
        if let Some(name) = self.thread_name {
            set_thread_name(name);
        }
        if self.callback.is_some() {
            set_error_cb(self.callback);
        }
        Ok(())
    }
}
