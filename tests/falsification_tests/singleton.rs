//! Falsification Tests: Singleton lock (F001-F009)

use nix::errno::Errno;
use nix::sys::signal::Signal;
use proptest::prelude::*;
use rundaemon_core::{is_locked, read_pid};

use super::support::{Report, SETTLE, Sandbox, probe, spawn_probe, stop, wait_unlocked};

/// F001: A launch reports the daemon pid and records it in the lock file
#[test]
fn f001_launch_records_daemon_pid() {
    let sandbox = Sandbox::new();
    let lock = sandbox.lock();

    let (report, output) = probe(&lock, &["loop"]);
    let pid = report.pid();

    assert!(output.status.success(), "F001 FALSIFIED: launcher exited {:?}", output.status);
    assert_eq!(
        read_pid(&lock).unwrap(),
        Some(pid),
        "F001 FALSIFIED: lock file does not hold the daemon pid"
    );
    assert!(is_locked(&lock).unwrap(), "F001 FALSIFIED: daemon does not hold the lock");

    stop(pid, Signal::SIGTERM, &lock);
}

/// F002: A second launch while the daemon runs reports AlreadyRunning and
/// leaves the first daemon's pid in place
#[test]
fn f002_second_launch_is_already_running() {
    let sandbox = Sandbox::new();
    let lock = sandbox.lock();

    let first = probe(&lock, &["loop"]).0.pid();
    let (second, output) = probe(&lock, &["loop"]);

    assert_eq!(second, Report::AlreadyRunning, "F002 FALSIFIED: second launch succeeded");
    assert!(output.status.success(), "F002 FALSIFIED: AlreadyRunning must exit 0");
    assert_eq!(
        read_pid(&lock).unwrap(),
        Some(first),
        "F002 FALSIFIED: failed launch clobbered the holder's pid"
    );

    stop(first, Signal::SIGTERM, &lock);
}

/// F003: A daemon killed with SIGKILL leaves a stale file, never a stale lock
#[test]
fn f003_relaunch_after_sigkill() {
    let sandbox = Sandbox::new();
    let lock = sandbox.lock();

    let first = probe(&lock, &["loop"]).0.pid();
    stop(first, Signal::SIGKILL, &lock);
    assert!(lock.exists(), "lock file should outlive its holder");

    let second = probe(&lock, &["loop"]).0.pid();
    assert_ne!(first, second);
    assert_eq!(
        read_pid(&lock).unwrap(),
        Some(second),
        "F003 FALSIFIED: relaunch did not record its pid"
    );

    stop(second, Signal::SIGTERM, &lock);
}

/// F004: A leftover file with garbage in it does not block a launch
#[test]
fn f004_garbage_lock_file_is_reclaimed() {
    let sandbox = Sandbox::new();
    let lock = sandbox.lock();
    std::fs::write(&lock, "not a pid at all\n").unwrap();

    let pid = probe(&lock, &["loop"]).0.pid();
    assert_eq!(read_pid(&lock).unwrap(), Some(pid));

    stop(pid, Signal::SIGTERM, &lock);
}

/// F005: An unusable lock path is a low-level error with the OS errno
#[test]
fn f005_missing_directory_is_low_level_error() {
    let sandbox = Sandbox::new();
    let lock = sandbox.path("missing").join("daemon.pid");

    let (report, output) = probe(&lock, &["exit", "0"]);

    assert_eq!(report, Report::Error(Errno::ENOENT as i32), "F005 FALSIFIED: {report:?}");
    assert_eq!(output.status.code(), Some(1));
}

/// F006: The lock is released when the daemon body returns
#[test]
fn f006_lock_released_after_body_returns() {
    let sandbox = Sandbox::new();
    let lock = sandbox.lock();

    let _ = probe(&lock, &["exit", "0", "--hold-ms", "100"]).0.pid();
    assert!(
        wait_unlocked(&lock, SETTLE),
        "F006 FALSIFIED: lock outlived the daemon process"
    );

    // and the path is immediately reusable
    let again = probe(&lock, &["exit", "0"]).0;
    assert!(matches!(again, Report::Launched(_)));
    assert!(wait_unlocked(&lock, SETTLE));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// F007: Of N concurrent launchers, exactly one launches
    #[test]
    fn f007_concurrent_launchers_exactly_one_wins(n in 2usize..6) {
        let sandbox = Sandbox::new();
        let lock = sandbox.lock();

        let children: Vec<_> = (0..n).map(|_| spawn_probe(&lock, &["loop"])).collect();
        let reports: Vec<Report> = children
            .into_iter()
            .map(|child| Report::parse(&child.wait_with_output().unwrap()))
            .collect();

        let winners: Vec<_> = reports
            .iter()
            .filter_map(|r| match r {
                Report::Launched(pid) => Some(*pid),
                _ => None,
            })
            .collect();
        let losers = reports.iter().filter(|r| **r == Report::AlreadyRunning).count();

        prop_assert_eq!(winners.len(), 1, "F007 FALSIFIED: {:?}", reports);
        prop_assert_eq!(losers, n - 1, "F007 FALSIFIED: {:?}", reports);

        stop(winners[0], Signal::SIGTERM, &lock);
    }
}
