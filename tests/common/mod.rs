use locksmith::{Diagnostic, Locksmith};
use std::sync::mpsc;
use std::time::Duration;

#[allow(dead_code)]
pub const DIAG_TIMEOUT: Duration = Duration::from_secs(3);
#[allow(dead_code)]
pub const QUIET_TIMEOUT: Duration = Duration::from_millis(400);

pub struct CheckerHarness {
    pub rx: mpsc::Receiver<Diagnostic>,
}

/// Install a callback that forwards every diagnostic to the harness
/// channel. The callback and registry are process-wide, which is why each
/// scenario lives in its own test file.
pub fn start_checker() -> CheckerHarness {
    let (tx, rx) = mpsc::channel::<Diagnostic>();

    Locksmith::new()
        .callback(move |diag| {
            let _ = tx.send(diag.clone());
        })
        .start()
        .expect("failed to start checker");

    CheckerHarness { rx }
}

/// Wait for a diagnostic with the given code, skipping unrelated ones.
#[allow(dead_code)]
pub fn expect_code(harness: &CheckerHarness, code: i32, timeout: Duration) -> Diagnostic {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        match harness.rx.recv_timeout(remaining) {
            Ok(diag) if diag.code == code => return diag,
            Ok(_) => continue,
            Err(_) => panic!("no diagnostic with code {code} within {timeout:?}"),
        }
    }
}

/// Assert that no diagnostic at all arrives within the window.
#[allow(dead_code)]
pub fn assert_quiet(harness: &CheckerHarness, timeout: Duration) {
    if let Ok(diag) = harness.rx.recv_timeout(timeout) {
        panic!("unexpected diagnostic: code {} ({})", diag.code, diag.message);
    }
}
