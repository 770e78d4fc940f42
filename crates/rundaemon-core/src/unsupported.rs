//! Unsupported platform implementation.
//!
//! There is no `fork`; every launch reports [`LaunchError::Unsupported`] and
//! the body never runs.

use std::path::Path;

use crate::error::LaunchError;
use crate::flags::DaemonFlags;
use crate::outcome::{DaemonExitStatus, LaunchOutcome};

pub fn launch<A, R, F>(
    _flags: DaemonFlags,
    _lock_path: &Path,
    _body: F,
    _arg: A,
    _exit_status: &mut DaemonExitStatus,
) -> LaunchOutcome
where
    F: FnOnce(A) -> R,
    R: Into<DaemonExitStatus>,
{
    LaunchOutcome::LowLevelError(LaunchError::Unsupported)
}
