//! Owned launch request.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::flags::DaemonFlags;
use crate::outcome::{DaemonExitStatus, LaunchOutcome};

/// Everything needed to launch one daemon, consumed by [`launch`](Self::launch).
///
/// ```rust,no_run
/// use rundaemon_core::{DaemonExitStatus, DaemonFlags, DaemonRequest, LaunchOutcome};
///
/// let mut status = DaemonExitStatus::default();
/// let outcome = DaemonRequest::new("/run/worker.pid", |greeting: &str| {
///     // runs only in the daemon
///     i32::from(greeting.is_empty())
/// }, "hello")
/// .flags(DaemonFlags::builder().chdir_root(false).build())
/// .launch(&mut status);
///
/// match outcome {
///     LaunchOutcome::RanAsDaemon => std::process::exit(status.code()),
///     other => println!("{other}"),
/// }
/// ```
pub struct DaemonRequest<A, F> {
    flags: DaemonFlags,
    lock_path: PathBuf,
    body: F,
    arg: A,
}

impl<A, F> DaemonRequest<A, F> {
    /// Creates a request with default [`DaemonFlags`].
    pub fn new(lock_path: impl Into<PathBuf>, body: F, arg: A) -> Self {
        Self {
            flags: DaemonFlags::default(),
            lock_path: lock_path.into(),
            body,
            arg,
        }
    }

    /// Replaces the creation flags.
    #[must_use]
    pub const fn flags(mut self, flags: DaemonFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Lock file path.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Creation flags.
    #[must_use]
    pub const fn daemon_flags(&self) -> DaemonFlags {
        self.flags
    }

    /// Launches the daemon. See [`launch`](crate::launch).
    pub fn launch<R>(self, exit_status: &mut DaemonExitStatus) -> LaunchOutcome
    where
        F: FnOnce(A) -> R,
        R: Into<DaemonExitStatus>,
    {
        crate::launch(self.flags, self.body, self.arg, exit_status, &self.lock_path)
    }
}

impl<A, F> fmt::Debug for DaemonRequest<A, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonRequest")
            .field("flags", &self.flags)
            .field("lock_path", &self.lock_path)
            .finish_non_exhaustive()
    }
}
