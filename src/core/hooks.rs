//! The pre/post hook contract consumed by lock wrappers.
//!
//! Every wrapper, whether the library-native types in `core::locks` or a
//! host interposer calling through the FFI exports, brackets the real
//! primitive with these hooks: `pre_lock` before the real acquisition,
//! `post_lock` after it with the real return code, `pre_unlock` before the
//! real release, `post_unlock` after a successful one. Init and destroy
//! wrappers call [`optional_init`] / [`explicit_init`] / [`destroy`].
//!
//! The hooks take the registry lock for bounded, CPU-only sections and
//! never hold it across the real primitive. Diagnostics are collected under
//! the lock and emitted after it is released.

use crate::core::registry::{GLOBAL_REGISTRY, InitOutcome};
use crate::core::report::report;
use crate::core::thread_state;
use crate::core::types::{Diagnostic, LockError, LockId, LockKind};

fn fmt_path(path: &[LockId]) -> String {
    let mut out = String::new();
    for (i, id) in path.iter().enumerate() {
        if i > 0 {
            out.push_str(" -> ");
        }
        out.push_str(&format!("{id:#x}"));
    }
    out
}

/// Admission check before the real acquisition.
///
/// Ensures a registry record exists (create-on-first-use), then checks the
/// caller's held set for an ordering inversion. Every inversion found is
/// reported with EDEADLK; none of them vetoes the acquisition, so the
/// return value is an error only when the arguments themselves are bad.
pub fn pre_lock(id: LockId, kind: LockKind) -> Result<(), LockError> {
    let (thread, thread_name, held) = thread_state::with_current(|ts| {
        (ts.id(), ts.name().map(str::to_owned), ts.held_snapshot())
    });

    let inversions = {
        let mut registry = GLOBAL_REGISTRY.lock();
        registry.optional_init(id, kind);
        if held.is_empty() {
            Vec::new()
        } else {
            registry.find_inversions(id, &held)
        }
    };

    for inversion in inversions {
        report(Diagnostic::new(
            libc::EDEADLK,
            thread,
            thread_name.clone(),
            inversion.path.clone(),
            format!(
                "lock inversion: acquiring {} {:#x} while holding {:#x} \
                 reverses the established order {} (potential deadlock)",
                kind.noun(),
                inversion.acquiring,
                inversion.held,
                fmt_path(&inversion.path),
            ),
        ));
    }
    Ok(())
}

/// Completion of an acquisition attempt. `real_code` is the real
/// primitive's return code: on 0, edges are recorded from every held lock
/// to `id` and the lock joins the held sequence; on anything else (busy
/// trylock, EDEADLK self-lock, timeout) nothing changes.
pub fn post_lock(id: LockId, real_code: i32) {
    if real_code != 0 {
        return;
    }
    let thread = thread_state::current_thread_id();
    let held = thread_state::with_current(|ts| ts.held_snapshot());

    let kind = {
        let mut registry = GLOBAL_REGISTRY.lock();
        registry.record_edges(&held, id);
        registry.note_acquired(id, thread);
        registry.kind_of(id).unwrap_or(LockKind::Sleep)
    };

    thread_state::with_current(|ts| ts.push(id, kind));
}

/// Ownership check before the real release. A lock absent from the
/// caller's held sequence is reported (EPERM) and signalled to the
/// wrapper, which still calls the real unlock so behavior matches the
/// underlying library. Nothing is removed here: removal happens in
/// [`post_unlock`], so a failed real unlock leaves the held set intact.
pub fn pre_unlock(id: LockId) -> Result<(), LockError> {
    let (thread, thread_name, owned) = thread_state::with_current(|ts| {
        (ts.id(), ts.name().map(str::to_owned), ts.contains(id))
    });
    if owned {
        return Ok(());
    }
    report(Diagnostic::new(
        libc::EPERM,
        thread,
        thread_name,
        vec![id],
        format!("unlock of lock {id:#x} which the calling thread does not hold"),
    ));
    Err(LockError::NotOwner)
}

/// Completion of a successful release: the lock leaves the held sequence
/// (or drops a recursion level) and its holder mark is cleared. Must only
/// be called after the real unlock returned 0.
pub fn post_unlock(id: LockId) {
    let thread = thread_state::current_thread_id();
    let fully_released = thread_state::with_current(|ts| ts.pop(id)).unwrap_or(false);
    if fully_released {
        GLOBAL_REGISTRY.lock().note_released(id, thread);
    }
}

/// Create-on-first-use registration, for wrappers that cannot tell whether
/// a static initializer was used. Idempotent.
pub fn optional_init(id: LockId, kind: LockKind) {
    GLOBAL_REGISTRY.lock().optional_init(id, kind);
}

/// Registration from an explicit init wrapper. A second init of a live
/// lock is reported (EINVAL) and otherwise tolerated; the real init
/// proceeds either way.
pub fn explicit_init(id: LockId, kind: LockKind) -> Result<(), LockError> {
    let outcome = GLOBAL_REGISTRY.lock().explicit_init(id, kind);
    if outcome == InitOutcome::AlreadyPresent {
        let (thread, thread_name) = thread_state::with_current(|ts| {
            (ts.id(), ts.name().map(str::to_owned))
        });
        report(Diagnostic::new(
            libc::EINVAL,
            thread,
            thread_name,
            vec![id],
            format!("double init of {} {id:#x}", kind.noun()),
        ));
    }
    Ok(())
}

/// Deregistration from a destroy wrapper. Destroying a lock some thread
/// still holds is reported (EBUSY) and refused; destroying an unknown lock
/// is benign (the lock may have been statically initialized and never
/// used) and returns NotFound without a diagnostic.
pub fn destroy(id: LockId) -> Result<(), LockError> {
    let result = GLOBAL_REGISTRY.lock().destroy(id);
    if result == Err(LockError::Busy) {
        let (thread, thread_name) = thread_state::with_current(|ts| {
            (ts.id(), ts.name().map(str::to_owned))
        });
        report(Diagnostic::new(
            libc::EBUSY,
            thread,
            thread_name,
            vec![id],
            format!("destroy of lock {id:#x} while it is still held"),
        ));
    }
    result
}
