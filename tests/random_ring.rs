use locksmith::Mutex;
use rand::seq::SliceRandom;
use std::sync::{Arc, mpsc};
use std::thread;

mod common;
use common::{DIAG_TIMEOUT, expect_code, start_checker};

// Dining-philosophers ordering, randomized: N threads each take the pair
// (i, i+1 mod N), in a random rotation, serialized by a token so nobody
// really blocks. Whichever pair runs last closes the ring in the order
// graph and must be diagnosed.
#[test]
fn randomized_ring_closes_and_is_diagnosed() {
    const RING: usize = 5;

    let harness = start_checker();

    let locks: Vec<Arc<Mutex>> = (0..RING).map(|_| Arc::new(Mutex::new())).collect();

    let mut order: Vec<usize> = (0..RING).collect();
    order.shuffle(&mut rand::rng());

    let mut done_rx: Option<mpsc::Receiver<()>> = None;
    for &i in &order {
        let first = Arc::clone(&locks[i]);
        let second = Arc::clone(&locks[(i + 1) % RING]);
        let prev_rx = done_rx.take();
        let (tx, rx) = mpsc::channel::<()>();
        done_rx = Some(rx);
        thread::spawn(move || {
            if let Some(prev) = prev_rx {
                prev.recv().unwrap();
            }
            first.lock().unwrap();
            second.lock().unwrap();
            second.unlock().unwrap();
            first.unlock().unwrap();
            tx.send(()).unwrap();
        });
    }
    done_rx.unwrap().recv().unwrap();

    let diag = expect_code(&harness, libc::EDEADLK, DIAG_TIMEOUT);
    assert!(diag.locks.len() >= 2);
    assert!(diag.message.contains("lock inversion"));
}
