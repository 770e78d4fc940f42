//! Error types for rundaemon-core.
//!
//! Lock contention is not an error here: it is reported as
//! [`LaunchOutcome::AlreadyRunning`](crate::LaunchOutcome::AlreadyRunning).
//! Everything in [`LaunchError`] is a low-level OS failure that the launcher
//! should surface to the user.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[cfg(unix)]
use crate::lock::LockError;

/// Step of the detachment sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetachStage {
    /// Creating the launcher/daemon handshake pipe.
    Pipe,
    /// First `fork(2)`, leaving the launcher.
    Fork,
    /// `setsid(2)`, leaving the controlling terminal.
    Setsid,
    /// Second `fork(2)`, giving up session leadership.
    SecondFork,
    /// Resetting signal dispositions and the signal mask.
    ResetSignals,
    /// `chdir("/")`.
    Chdir,
    /// Pointing stdin/stdout/stderr at `/dev/null`.
    RedirectStdio,
    /// Writing the daemon pid into the lock file.
    WritePid,
}

impl DetachStage {
    /// Wire code used by the launch handshake.
    pub(crate) const fn code(self) -> u8 {
        match self {
            Self::Pipe => 1,
            Self::Fork => 2,
            Self::Setsid => 3,
            Self::SecondFork => 4,
            Self::ResetSignals => 5,
            Self::Chdir => 6,
            Self::RedirectStdio => 7,
            Self::WritePid => 8,
        }
    }

    pub(crate) const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Pipe),
            2 => Some(Self::Fork),
            3 => Some(Self::Setsid),
            4 => Some(Self::SecondFork),
            5 => Some(Self::ResetSignals),
            6 => Some(Self::Chdir),
            7 => Some(Self::RedirectStdio),
            8 => Some(Self::WritePid),
            _ => None,
        }
    }
}

impl fmt::Display for DetachStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pipe => "pipe",
            Self::Fork => "fork",
            Self::Setsid => "setsid",
            Self::SecondFork => "second fork",
            Self::ResetSignals => "signal reset",
            Self::Chdir => "chdir",
            Self::RedirectStdio => "stdio redirection",
            Self::WritePid => "pid file write",
        };
        f.write_str(name)
    }
}

/// Low-level failure while launching a daemon.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Opening or locking the lock file failed (not contention).
    #[cfg(unix)]
    #[error(transparent)]
    Lock(LockError),

    /// A detachment step failed.
    #[error("{stage} failed during daemonization: {source}")]
    Detach {
        /// Failed step.
        stage: DetachStage,
        /// Originating OS error.
        source: io::Error,
    },

    /// The daemon side exited without reporting success or failure.
    #[error("daemon exited before completing the launch handshake")]
    HandshakeLost,

    /// Daemonization is not available on this platform.
    #[error("daemonization is not supported on this platform")]
    Unsupported,
}

impl LaunchError {
    pub(crate) fn detach(stage: DetachStage, source: impl Into<io::Error>) -> Self {
        Self::Detach {
            stage,
            source: source.into(),
        }
    }

    /// Raw OS error code (`errno`) behind this failure, if any.
    #[must_use]
    pub fn errno(&self) -> Option<i32> {
        match self {
            #[cfg(unix)]
            Self::Lock(err) => err.raw_os_error(),
            Self::Detach { source, .. } => source.raw_os_error(),
            Self::HandshakeLost | Self::Unsupported => None,
        }
    }

    /// Detachment step that failed, if the failure happened after locking.
    #[must_use]
    pub const fn stage(&self) -> Option<DetachStage> {
        match self {
            Self::Detach { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
