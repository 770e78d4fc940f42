//! Falsification Tests: Reference daemon signal handling (F010-F019)

use nix::sys::signal::{Signal, kill};
use rundaemon_core::is_locked;

use super::support::{SETTLE, Sandbox, probe_logged, stop, wait_unlocked};

/// F010: SIGTERM stops the daemon with status 0 and logs the stop
#[test]
fn f010_sigterm_stops_with_success() {
    let sandbox = Sandbox::new();
    let lock = sandbox.lock();
    let mut syslog = sandbox.syslog();

    let pid = probe_logged(&lock, &syslog, &["loop"]).pid();
    let started = syslog.wait_for("daemon started with pid");
    assert!(
        started.contains(&format!("PROBE[{pid}]")),
        "F010 FALSIFIED: start record not tagged with the daemon pid: {started}"
    );
    syslog.wait_for("listening for signals");

    kill(pid, Signal::SIGTERM).unwrap();
    syslog.wait_for("Got SIGTERM, stopping");
    let stopped = syslog.wait_for("daemon stopped with status code");
    assert!(
        stopped.contains("daemon stopped with status code 0"),
        "F010 FALSIFIED: {stopped}"
    );

    assert!(
        wait_unlocked(&lock, SETTLE),
        "F010 FALSIFIED: daemon still holds the lock after stopping"
    );
}

/// F011: SIGHUP never terminates the daemon
#[test]
fn f011_sighup_keeps_running() {
    let sandbox = Sandbox::new();
    let lock = sandbox.lock();
    let mut syslog = sandbox.syslog();

    let pid = probe_logged(&lock, &syslog, &["loop"]).pid();
    syslog.wait_for("listening for signals");

    for _ in 0..3 {
        kill(pid, Signal::SIGHUP).unwrap();
        syslog.wait_for("Got SIGHUP, reloading");
    }
    assert!(is_locked(&lock).unwrap(), "F011 FALSIFIED: daemon died after SIGHUP");
    assert!(syslog.seen_containing("daemon stopped").is_empty());

    stop(pid, Signal::SIGTERM, &lock);
}

/// F012: An intercepted unexpected signal produces exactly one warning and
/// leaves the daemon running
#[test]
fn f012_unexpected_signal_warns_once() {
    let sandbox = Sandbox::new();
    let lock = sandbox.lock();
    let mut syslog = sandbox.syslog();

    let pid = probe_logged(&lock, &syslog, &["loop"]).pid();
    syslog.wait_for("listening for signals");

    kill(pid, Signal::SIGUSR1).unwrap();
    let warning = syslog.wait_for("Got unexpected signal SIGUSR1");
    // facility daemon, severity warning
    assert!(warning.starts_with("<28>"), "F012 FALSIFIED: {warning}");

    // a reload afterwards proves the loop is still dispatching
    kill(pid, Signal::SIGHUP).unwrap();
    syslog.wait_for("Got SIGHUP, reloading");

    assert_eq!(
        syslog.seen_containing("unexpected signal").len(),
        1,
        "F012 FALSIFIED: expected exactly one warning"
    );
    assert!(is_locked(&lock).unwrap());

    stop(pid, Signal::SIGTERM, &lock);
}
