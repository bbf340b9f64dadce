//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

/// Route `tracing` output through the test harness
///
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=batchring=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `condition` until it holds, failing the test after five seconds
pub fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}
