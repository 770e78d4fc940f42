// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # rundaemon-core
//!
//! Turn a function into a singleton background daemon.
//!
//! [`launch`] takes an exclusive `flock` on a well-known path, detaches with
//! the classic double fork, records the daemon pid in the lock file and runs
//! the body in the daemon. It returns in *both* processes:
//!
//! ```rust,no_run
//! use rundaemon_core::{DaemonExitStatus, DaemonFlags, LaunchOutcome, launch};
//!
//! fn serve(port: u16) -> i32 {
//!     // ... daemon work ...
//!     i32::from(port == 0)
//! }
//!
//! let mut status = DaemonExitStatus::default();
//! match launch(DaemonFlags::default(), serve, 8080, &mut status, "/run/serve.pid") {
//!     LaunchOutcome::Launched(pid) => println!("daemon is {pid}"),
//!     LaunchOutcome::AlreadyRunning => eprintln!("already running"),
//!     LaunchOutcome::LowLevelError(e) => eprintln!("cannot start: {e}"),
//!     LaunchOutcome::RanAsDaemon => std::process::exit(status.code()),
//! }
//! ```
//!
//! ## Singleton guarantee
//!
//! At most one process holds the lock for a path at any instant. The lock
//! belongs to the open file description, so it follows the daemon through
//! both forks and is dropped by the kernel when the daemon dies, even by
//! `SIGKILL`. A lock file left behind by a dead daemon is reclaimed by the
//! next [`launch`] in the same atomic `flock` call.
//!
//! ## Threads
//!
//! `fork` duplicates only the calling thread. Call [`launch`] before
//! starting any runtime or worker threads.
//!
//! ## Platform Support
//!
//! | Platform | Support |
//! |----------|---------|
//! | Linux    | Full    |
//! | Other Unix | Full  |
//! | Others   | [`LaunchError::Unsupported`] |

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod error;
mod flags;
mod outcome;
mod request;

#[cfg(unix)]
mod handshake;
#[cfg(unix)]
mod lock;
#[cfg(unix)]
mod unix;

#[cfg(not(unix))]
mod unsupported;

use std::path::Path;

pub use config::{DEFAULT_IDENT, DEFAULT_LOCK_PATH, DaemonConfig};
pub use error::{ConfigError, DetachStage, LaunchError};
pub use flags::{DaemonFlags, DaemonFlagsBuilder};
#[cfg(unix)]
pub use lock::{LockError, SingletonLock, is_locked, read_pid};
pub use outcome::{DaemonExitStatus, LaunchOutcome, Pid};
pub use request::DaemonRequest;

/// Launch `body(arg)` as a singleton daemon guarded by `lock_path`.
///
/// In the original process this returns [`LaunchOutcome::Launched`] once the
/// daemon has detached and written its pid, [`LaunchOutcome::AlreadyRunning`]
/// if a live process holds the lock, or [`LaunchOutcome::LowLevelError`].
/// The body never runs in the original process.
///
/// In the daemon process this returns [`LaunchOutcome::RanAsDaemon`] after
/// `body` has returned; its value is stored in `exit_status`. The lock stays
/// held until the daemon process exits, which it should do promptly with
/// that status.
///
/// "Live process" includes a concurrent [`is_locked`] check on the same path,
/// which takes the lock for an instant. A launch racing with it can report
/// [`LaunchOutcome::AlreadyRunning`] although no daemon is running; callers
/// that poll with [`is_locked`] should retry a launch that loses that race.
///
/// # Platform Behavior
///
/// - **Unix**: double fork, `setsid`, then the steps enabled in `flags`
/// - **Others**: returns `LowLevelError(LaunchError::Unsupported)`
pub fn launch<A, R, F>(
    flags: DaemonFlags,
    body: F,
    arg: A,
    exit_status: &mut DaemonExitStatus,
    lock_path: impl AsRef<Path>,
) -> LaunchOutcome
where
    F: FnOnce(A) -> R,
    R: Into<DaemonExitStatus>,
{
    #[cfg(unix)]
    {
        unix::launch(flags, lock_path.as_ref(), body, arg, exit_status)
    }

    #[cfg(not(unix))]
    {
        unsupported::launch(flags, lock_path.as_ref(), body, arg, exit_status)
    }
}
