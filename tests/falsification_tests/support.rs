//! Process and syslog helpers shared by the falsification tests.

use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use rundaemon_core::is_locked;
use rundaemon_observe::SYSLOG_PATH_ENV;
use tempfile::TempDir;

pub const PROBE: &str = env!("CARGO_BIN_EXE_launch-probe");

/// How long any daemon-side effect may take to become visible.
pub const SETTLE: Duration = Duration::from_secs(5);

/// One line the probe printed in the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Launched(Pid),
    AlreadyRunning,
    Error(i32),
}

impl Report {
    pub fn parse(output: &Output) -> Self {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().next().unwrap_or_default();
        let mut words = line.split_whitespace();
        match words.next() {
            Some("launched") => Self::Launched(Pid::from_raw(
                words.next().unwrap().parse().unwrap(),
            )),
            Some("already-running") => Self::AlreadyRunning,
            Some("error") => Self::Error(words.next().unwrap().parse().unwrap()),
            _ => panic!("unexpected probe output: {stdout:?}"),
        }
    }

    pub fn pid(&self) -> Pid {
        match self {
            Self::Launched(pid) => *pid,
            other => panic!("expected a launch, got {other:?}"),
        }
    }
}

/// Temporary directory holding the lock file and, optionally, a syslog socket.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn lock(&self) -> PathBuf {
        self.dir.path().join("daemon.pid")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn syslog(&self) -> Syslog {
        Syslog::bind(&self.dir.path().join("log.sock"))
    }
}

pub fn probe_command(lock: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(PROBE);
    cmd.arg(lock)
        .args(args)
        .env_remove(SYSLOG_PATH_ENV)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    cmd
}

/// Run the probe to completion in the launcher.
pub fn probe(lock: &Path, args: &[&str]) -> (Report, Output) {
    let output = probe_command(lock, args).output().unwrap();
    (Report::parse(&output), output)
}

/// Start the probe without waiting for it.
pub fn spawn_probe(lock: &Path, args: &[&str]) -> Child {
    probe_command(lock, args).spawn().unwrap()
}

/// Run the probe with syslog pointed at `syslog`.
pub fn probe_logged(lock: &Path, syslog: &Syslog, args: &[&str]) -> Report {
    let output = probe_command(lock, args)
        .env(SYSLOG_PATH_ENV, syslog.path())
        .output()
        .unwrap();
    Report::parse(&output)
}

/// Poll until nobody holds `lock`.
pub fn wait_unlocked(lock: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !is_locked(lock).unwrap() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

/// Send `sig`, then wait for the lock to be released.
pub fn stop(pid: Pid, sig: Signal, lock: &Path) {
    kill(pid, sig).unwrap();
    assert!(
        wait_unlocked(lock, SETTLE),
        "daemon {pid} still holds {} after {sig}",
        lock.display()
    );
}

/// Datagram socket standing in for `/dev/log`.
pub struct Syslog {
    sock: UnixDatagram,
    path: PathBuf,
    seen: Vec<String>,
}

impl Syslog {
    fn bind(path: &Path) -> Self {
        let sock = UnixDatagram::bind(path).unwrap();
        sock.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        Self {
            sock,
            path: path.to_path_buf(),
            seen: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Receive records until one contains `needle`; returns that record.
    pub fn wait_for(&mut self, needle: &str) -> String {
        let deadline = Instant::now() + SETTLE;
        while Instant::now() < deadline {
            let mut buf = [0u8; 1024];
            if let Ok(n) = self.sock.recv(&mut buf) {
                let record = String::from_utf8_lossy(&buf[..n]).into_owned();
                self.seen.push(record.clone());
                if record.contains(needle) {
                    return record;
                }
            }
        }
        panic!("no syslog record containing {needle:?}; saw {:#?}", self.seen);
    }

    /// Every record received so far that contains `needle`.
    pub fn seen_containing(&self, needle: &str) -> Vec<&str> {
        self.seen
            .iter()
            .filter(|r| r.contains(needle))
            .map(String::as_str)
            .collect()
    }
}
