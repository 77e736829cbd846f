use locksmith::SpinLock;
use std::sync::{Arc, mpsc};
use std::thread;

mod common;
use common::{DIAG_TIMEOUT, expect_code, start_checker};

// Spin locks feed the same order graph as mutexes; only the diagnostic
// wording differs. Both pair acquisitions run to completion (no real
// contention), so the inversion is caught purely from the recorded order.
#[test]
fn spin_lock_inversion_is_tracked_like_a_mutex() {
    let harness = start_checker();

    let s1 = Arc::new(SpinLock::new());
    let s2 = Arc::new(SpinLock::new());
    let id1 = s1.id();
    let id2 = s2.id();

    let (tx, rx) = mpsc::channel::<()>();

    let a = {
        let s1 = Arc::clone(&s1);
        let s2 = Arc::clone(&s2);
        thread::spawn(move || {
            s1.lock().unwrap();
            s2.lock().unwrap();
            s2.unlock().unwrap();
            s1.unlock().unwrap();
            tx.send(()).unwrap();
        })
    };

    let b = {
        let s1 = Arc::clone(&s1);
        let s2 = Arc::clone(&s2);
        thread::spawn(move || {
            rx.recv().unwrap();
            s2.lock().unwrap();
            s1.lock().unwrap();
            s1.unlock().unwrap();
            s2.unlock().unwrap();
        })
    };

    let diag = expect_code(&harness, libc::EDEADLK, DIAG_TIMEOUT);
    assert_eq!(diag.locks, vec![id1, id2]);
    assert!(diag.message.contains("spin lock"));

    a.join().unwrap();
    b.join().unwrap();
}
