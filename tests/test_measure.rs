use std::time::{Duration, Instant};

use decruft::measure;
use decruft::Error;

#[test]
fn test_large_output_is_drained_without_stalling() {
    // 1 MiB is well past the OS pipe buffer; the child must not block on
    // write while the parent waits for it to exit.
    let started = Instant::now();
    let output =
        measure::run_with_timeout("head", &["-c", "1048576", "/dev/zero"], Duration::from_secs(10))
            .unwrap();

    assert!(output.status.success());
    assert_eq!(output.stdout.len(), 1024 * 1024);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_timeout_kills_a_hung_child() {
    let err = measure::run_with_timeout("sleep", &["30"], Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
}

#[test]
fn test_missing_program_is_an_error() {
    assert!(
        measure::run_with_timeout("no-such-program-4c1d", &[], Duration::from_secs(1)).is_err()
    );
}
