//! Singleton lock on a well-known path.
//!
//! The lock is an advisory `flock(2)` hold. It belongs to the open file
//! description rather than to the process, so it survives `fork` and the
//! kernel drops it when the last descriptor referring to it is closed,
//! including when the holder is killed with `SIGKILL`. A file left behind by
//! a dead holder is therefore never reported as held: reclaiming a stale lock
//! and acquiring a fresh one are the same atomic `flock` call.
//!
//! Two windows remain and callers reading the pid for introspection must
//! tolerate them:
//!
//! - between acquisition and [`SingletonLock::write_pid`] the file still
//!   holds the previous (stale) pid;
//! - on network filesystems that emulate `flock` with byte-range locks,
//!   atomicity is whatever the filesystem provides.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use nix::unistd::Pid;
use tracing::debug;

/// Errors from acquiring or inspecting a singleton lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another live process holds the lock.
    #[error("lock {} is held by another live process", path.display())]
    Contention {
        /// Lock file path.
        path: PathBuf,
    },

    /// The lock file could not be opened or created.
    #[error("failed to open lock file {}: {source}", path.display())]
    Open {
        /// Lock file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// `flock(2)` failed for a reason other than contention.
    #[error("flock on {} failed: {errno}", path.display())]
    Flock {
        /// Lock file path.
        path: PathBuf,
        /// Raw OS error.
        errno: Errno,
    },

    /// The pid could not be written to the lock file.
    #[error("failed to record pid in {}: {source}", path.display())]
    Write {
        /// Lock file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The lock file could not be read.
    #[error("failed to read lock file {}: {source}", path.display())]
    Read {
        /// Lock file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The lock file does not contain a pid.
    #[error("lock file {} does not contain a pid: {content:?}", path.display())]
    Malformed {
        /// Lock file path.
        path: PathBuf,
        /// What was found instead.
        content: String,
    },
}

impl LockError {
    /// Returns true if the lock is held by another live process.
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }

    /// Raw OS error code behind this failure, if any.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Open { source, .. } | Self::Write { source, .. } | Self::Read { source, .. } => {
                source.raw_os_error()
            }
            Self::Flock { errno, .. } => Some(*errno as i32),
            Self::Contention { .. } | Self::Malformed { .. } => None,
        }
    }

    /// Converts into an `io::Error`, keeping the OS error code when present.
    #[must_use]
    pub fn into_io_error(self) -> io::Error {
        match self {
            Self::Open { source, .. } | Self::Write { source, .. } | Self::Read { source, .. } => {
                source
            }
            Self::Flock { errno, .. } => io::Error::from(errno),
            Self::Contention { .. } => io::Error::from(Errno::EWOULDBLOCK),
            other @ Self::Malformed { .. } => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Exclusive hold on a lock file.
///
/// Dropping the value unlocks explicitly. [`SingletonLock::leak`] keeps the
/// lock until the process exits, and [`SingletonLock::relinquish`] closes this
/// process's descriptor without unlocking, leaving the lock to whichever
/// forked process still shares it.
pub struct SingletonLock {
    path: PathBuf,
    file: Flock<File>,
}

impl SingletonLock {
    /// Try to take the lock at `path` without blocking.
    ///
    /// The file is created with mode `0644` if missing and is never truncated
    /// here, so a failed attempt cannot wipe the live holder's pid.
    ///
    /// # Errors
    ///
    /// - [`LockError::Contention`] if a live process holds the lock
    /// - [`LockError::Open`] / [`LockError::Flock`] for any other OS failure
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(file) => {
                debug!(path = %path.display(), "acquired singleton lock");
                Ok(Self { path, file })
            }
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Err(LockError::Contention { path }),
            Err((_, errno)) => Err(LockError::Flock { path, errno }),
        }
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents with `pid` and a newline, then fsync.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Write`] if truncating, writing or syncing fails.
    pub fn write_pid(&mut self, pid: Pid) -> Result<(), LockError> {
        let file: &File = &self.file;
        overwrite_pid(file, pid).map_err(|source| LockError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Unlock and close.
    pub fn release(self) {
        debug!(path = %self.path.display(), "releasing singleton lock");
        drop(self.file);
    }

    /// Keep the lock until the process exits.
    ///
    /// The descriptor is intentionally never closed; the kernel releases the
    /// lock when the process terminates.
    pub fn leak(self) {
        std::mem::forget(self.file);
    }

    /// Close this process's descriptor without unlocking.
    ///
    /// Used by the launcher after `fork`: the child shares the same open file
    /// description and keeps the lock. Dropping the `Flock` would run
    /// `flock(LOCK_UN)` on that shared description, so the guard is forgotten
    /// and only the descriptor is closed.
    pub fn relinquish(self) {
        let fd = self.file.as_raw_fd();
        std::mem::forget(self.file);
        if let Err(errno) = nix::unistd::close(fd) {
            debug!(path = %self.path.display(), %errno, "closing relinquished lock descriptor failed");
        }
    }
}

impl fmt::Debug for SingletonLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn overwrite_pid(mut file: &File, pid: Pid) -> io::Result<()> {
    file.set_len(0)?;
    file.rewind()?;
    writeln!(file, "{pid}")?;
    file.sync_all()
}

/// Read the pid recorded in a lock file, without locking it.
///
/// Returns `Ok(None)` if the file is missing or empty. The value may be stale;
/// see the module documentation.
///
/// # Errors
///
/// Returns [`LockError::Read`] on I/O failure and [`LockError::Malformed`] if
/// the contents are not a positive integer.
pub fn read_pid(path: impl AsRef<Path>) -> Result<Option<Pid>, LockError> {
    let path = path.as_ref();

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LockError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<i32>() {
        Ok(raw) if raw > 0 => Ok(Some(Pid::from_raw(raw))),
        _ => Err(LockError::Malformed {
            path: path.to_path_buf(),
            content: trimmed.to_string(),
        }),
    }
}

/// Check whether a live process holds the lock at `path`.
///
/// Probes by taking and immediately dropping the lock on a fresh descriptor.
/// `flock` locks cannot be inspected without taking them, so a launcher
/// racing with the probe may observe contention for that instant. The probe
/// never outlives the call.
///
/// # Errors
///
/// Returns [`LockError::Open`] or [`LockError::Flock`] on OS failure.
pub fn is_locked(path: impl AsRef<Path>) -> Result<bool, LockError> {
    let path = path.as_ref();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(LockError::Open {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(probe) => {
            drop(probe);
            Ok(false)
        }
        Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(true),
        Err((_, errno)) => Err(LockError::Flock {
            path: path.to_path_buf(),
            errno,
        }),
    }
}
