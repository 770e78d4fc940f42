//! Result vocabulary of [`launch`](crate::launch).

use std::fmt;
use std::process::ExitCode;

#[cfg(unix)]
pub use nix::unistd::Pid;

/// Process id of a launched daemon.
#[cfg(not(unix))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(i32);

#[cfg(not(unix))]
impl Pid {
    /// Wraps a raw process id.
    #[must_use]
    pub const fn from_raw(pid: i32) -> Self {
        Self(pid)
    }

    /// Raw process id.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

#[cfg(not(unix))]
impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

use crate::error::LaunchError;

/// Exit status produced by a daemon body.
///
/// The daemon process should exit with exactly this value after
/// [`LaunchOutcome::RanAsDaemon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DaemonExitStatus(i32);

impl DaemonExitStatus {
    /// Conventional success (`EXIT_SUCCESS`).
    pub const SUCCESS: Self = Self(0);

    /// Conventional failure (`EXIT_FAILURE`).
    pub const FAILURE: Self = Self(1);

    /// Wraps a raw status code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Raw status code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns true for status `0`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for DaemonExitStatus {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<u8> for DaemonExitStatus {
    fn from(code: u8) -> Self {
        Self(i32::from(code))
    }
}

/// The OS keeps only the low eight bits of an exit status.
impl From<DaemonExitStatus> for ExitCode {
    fn from(status: DaemonExitStatus) -> Self {
        Self::from((status.0 & 0xff) as u8)
    }
}

impl fmt::Display for DaemonExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened in *this* process after a launch attempt.
///
/// Both the launcher and the daemon return from the same
/// [`launch`](crate::launch) call, each with a different variant:
///
/// | Variant | Process | Caller should |
/// |---|---|---|
/// | `Launched(pid)` | launcher | report the pid, exit 0 |
/// | `AlreadyRunning` | launcher | report, exit 0 |
/// | `LowLevelError(e)` | launcher | report `e`, exit nonzero |
/// | `RanAsDaemon` | daemon | exit with the stored status |
#[derive(Debug)]
#[must_use = "the launcher and the daemon must act on the outcome differently"]
pub enum LaunchOutcome {
    /// An OS primitive failed; nothing is left running and the lock is free.
    LowLevelError(LaunchError),

    /// A live process already holds the lock.
    AlreadyRunning,

    /// This process is the daemon and the body has already returned. Its
    /// status is in the caller's output slot.
    RanAsDaemon,

    /// This process is the original launcher; the daemon runs as `pid`.
    Launched(Pid),
}

impl LaunchOutcome {
    /// Returns true in the daemon process.
    #[must_use]
    pub const fn is_daemon(&self) -> bool {
        matches!(self, Self::RanAsDaemon)
    }

    /// Returns true when another instance holds the lock.
    #[must_use]
    pub const fn is_already_running(&self) -> bool {
        matches!(self, Self::AlreadyRunning)
    }

    /// Pid of the daemon, in the launcher.
    #[must_use]
    pub const fn daemon_pid(&self) -> Option<Pid> {
        match self {
            Self::Launched(pid) => Some(*pid),
            _ => None,
        }
    }

    /// The low-level error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&LaunchError> {
        match self {
            Self::LowLevelError(err) => Some(err),
            _ => None,
        }
    }

    /// Exit code the *launcher* should use: `0` after a launch or when an
    /// instance is already running, `1` on low-level failure.
    ///
    /// Returns `None` in the daemon process, which exits with the body's
    /// status instead.
    #[must_use]
    pub const fn launcher_exit_code(&self) -> Option<u8> {
        match self {
            Self::Launched(_) | Self::AlreadyRunning => Some(0),
            Self::LowLevelError(_) => Some(1),
            Self::RanAsDaemon => None,
        }
    }
}

impl fmt::Display for LaunchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowLevelError(err) => write!(f, "low-level error: {err}"),
            Self::AlreadyRunning => f.write_str("already running"),
            Self::RanAsDaemon => f.write_str("ran as daemon"),
            Self::Launched(pid) => write!(f, "launched daemon {pid}"),
        }
    }
}
