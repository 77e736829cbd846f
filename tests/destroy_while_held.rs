use locksmith::{LockError, Mutex};

mod common;
use common::{DIAG_TIMEOUT, expect_code, start_checker};

// Destroying a held lock is refused with EBUSY and reported; after the
// unlock the destroy goes through and the registry forgets the lock.
#[test]
fn destroy_of_held_lock_is_busy_then_succeeds() {
    let harness = start_checker();

    let m = Mutex::new();
    m.lock().unwrap();

    assert_eq!(m.destroy(), Err(LockError::Busy));
    let diag = expect_code(&harness, libc::EBUSY, DIAG_TIMEOUT);
    assert_eq!(diag.locks, vec![m.id()]);

    // The record survived the refused destroy.
    assert!(locksmith::lock_info(m.id()).is_some());

    m.unlock().unwrap();
    assert_eq!(m.destroy(), Ok(()));
    assert!(locksmith::lock_info(m.id()).is_none());

    // A second destroy finds nothing; benign.
    assert_eq!(m.destroy(), Err(LockError::NotFound));
}
