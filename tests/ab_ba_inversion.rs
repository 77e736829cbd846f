use locksmith::{LockError, Mutex};
use std::sync::{Arc, mpsc};
use std::thread;

mod common;
use common::{DIAG_TIMEOUT, expect_code, start_checker};

// Two locks taken in opposite orders by two threads. Thread B's trylock
// fails with busy (A still holds L1), but the admission check sees that
// acquiring L1 while holding L2 reverses the already-recorded L1 -> L2
// order and reports EDEADLK either way.
#[test]
fn ab_ba_inversion_reports_edeadlk() {
    let harness = start_checker();

    let l1 = Arc::new(Mutex::new());
    let l2 = Arc::new(Mutex::new());
    let id1 = l1.id();
    let id2 = l2.id();

    let (order_tx, order_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let a = {
        let l1 = Arc::clone(&l1);
        let l2 = Arc::clone(&l2);
        thread::spawn(move || {
            l1.lock().unwrap();
            l2.lock().unwrap();
            l2.unlock().unwrap();
            order_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            l1.unlock().unwrap();
        })
    };

    let b = {
        let l1 = Arc::clone(&l1);
        let l2 = Arc::clone(&l2);
        thread::spawn(move || {
            order_rx.recv().unwrap();
            l2.lock().unwrap();
            // A still holds L1, so the real trylock comes back busy.
            assert_eq!(l1.try_lock(), Err(LockError::Busy));
            l2.unlock().unwrap();
            release_tx.send(()).unwrap();
        })
    };

    let diag = expect_code(&harness, libc::EDEADLK, DIAG_TIMEOUT);
    assert_eq!(diag.locks, vec![id1, id2]);
    assert!(diag.message.contains("lock inversion"));

    a.join().unwrap();
    b.join().unwrap();
}
