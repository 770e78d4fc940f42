//! Unix implementation of the launch sequence.
//!
//! ```text
//! launcher ── lock ── pipe ── fork ─┬─ relinquish lock, read report, reap ─▶ Launched(pid)
//!                                   └─ setsid ── fork ─┬─ _exit(0)
//!                                                      └─ reset, chdir, stdio, pid
//!                                                         report ── body ─▶ RanAsDaemon
//! ```

use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{FcntlArg, FdFlag, fcntl};
use nix::sys::signal::{self, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::stat::{Mode, umask};
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, dup2, fork, getpid, setsid};
use tracing::{debug, info, warn};

use crate::error::{DetachStage, LaunchError};
use crate::flags::DaemonFlags;
use crate::handshake::{self, Report, Reporter};
use crate::lock::SingletonLock;
use crate::outcome::{DaemonExitStatus, LaunchOutcome};

/// Exit code of a daemon-side process that failed before running the body.
const DETACH_FAILURE_EXIT: i32 = 2;

pub fn launch<A, R, F>(
    flags: DaemonFlags,
    lock_path: &Path,
    body: F,
    arg: A,
    exit_status: &mut DaemonExitStatus,
) -> LaunchOutcome
where
    F: FnOnce(A) -> R,
    R: Into<DaemonExitStatus>,
{
    let lock = match SingletonLock::try_acquire(lock_path) {
        Ok(lock) => lock,
        Err(e) if e.is_contention() => {
            debug!(path = %lock_path.display(), "daemon already running");
            return LaunchOutcome::AlreadyRunning;
        }
        Err(e) => return LaunchOutcome::LowLevelError(LaunchError::Lock(e)),
    };

    let (read_end, write_end) = match handshake_pipe() {
        Ok(ends) => ends,
        Err(errno) => {
            lock.release();
            return LaunchOutcome::LowLevelError(LaunchError::detach(DetachStage::Pipe, errno));
        }
    };

    // SAFETY: the child only performs the detachment syscalls below before
    // running `body`; callers must launch before spawning threads.
    match unsafe { fork() } {
        Err(errno) => {
            lock.release();
            LaunchOutcome::LowLevelError(LaunchError::detach(DetachStage::Fork, errno))
        }
        Ok(ForkResult::Parent { child }) => {
            lock.relinquish();
            drop(write_end);

            let report = handshake::receive(read_end);
            reap(child);

            match report.and_then(Report::into_result) {
                Ok(pid) => {
                    info!(daemon_pid = pid.as_raw(), path = %lock_path.display(), "daemon launched");
                    LaunchOutcome::Launched(pid)
                }
                Err(e) => {
                    warn!(error = %e, "daemon launch failed");
                    LaunchOutcome::LowLevelError(e)
                }
            }
        }
        Ok(ForkResult::Child) => {
            drop(read_end);
            let lock = become_daemon(flags, lock, Reporter::new(write_end));

            *exit_status = body(arg).into();

            // Held until the process exits, not until this frame returns.
            lock.leak();
            LaunchOutcome::RanAsDaemon
        }
    }
}

/// Runs in the first child. Returns only in the daemon process; every
/// other path ends in `_exit`.
fn become_daemon(flags: DaemonFlags, mut lock: SingletonLock, reporter: Reporter) -> SingletonLock {
    if let Err(errno) = setsid() {
        abandon(lock, reporter, DetachStage::Setsid, errno.into());
    }

    // SAFETY: as above; the intermediate process only calls `_exit`.
    match unsafe { fork() } {
        Err(errno) => abandon(lock, reporter, DetachStage::SecondFork, errno.into()),
        Ok(ForkResult::Parent { .. }) => exit_immediately(0),
        Ok(ForkResult::Child) => {}
    }

    if flags.reset_signals() {
        if let Err(errno) = reset_signal_state() {
            abandon(lock, reporter, DetachStage::ResetSignals, errno.into());
        }
    }

    if let Some(mask) = flags.umask() {
        umask(Mode::from_bits_truncate(mask as libc::mode_t));
    }

    if flags.chdir_root() {
        if let Err(e) = std::env::set_current_dir("/") {
            abandon(lock, reporter, DetachStage::Chdir, e);
        }
    }

    if flags.redirect_stdio() {
        if let Err(e) = redirect_stdio_to_devnull() {
            abandon(lock, reporter, DetachStage::RedirectStdio, e);
        }
    }

    let pid = getpid();
    if let Err(e) = lock.write_pid(pid) {
        abandon(lock, reporter, DetachStage::WritePid, e.into_io_error());
    }

    if let Err(e) = reporter.send(Report::Ready(pid)) {
        // Nobody is waiting for us any more; running unannounced would leave
        // the launcher reporting a failure for a live daemon.
        debug!(error = %e, "launcher went away before the handshake");
        lock.release();
        exit_immediately(DETACH_FAILURE_EXIT);
    }

    debug!(pid = pid.as_raw(), "detached");
    lock
}

/// Release the lock, report the failed step, and exit this process.
///
/// The lock is released before reporting so the launcher can retry as soon
/// as it has read the report.
fn abandon(lock: SingletonLock, reporter: Reporter, stage: DetachStage, error: io::Error) -> ! {
    lock.release();
    let errno = error.raw_os_error().unwrap_or(libc::EIO);
    let _ = reporter.send(Report::Failed { stage, errno });
    exit_immediately(DETACH_FAILURE_EXIT)
}

fn exit_immediately(code: i32) -> ! {
    // SAFETY: `_exit` skips atexit handlers and stdio flushing, which belong
    // to the launcher and must not run twice.
    unsafe { libc::_exit(code) }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn handshake_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn handshake_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    let (read_end, write_end) = nix::unistd::pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read_end, write_end))
}

fn reap(child: Pid) {
    loop {
        match waitpid(child, None) {
            Err(Errno::EINTR) => {}
            Err(errno) => {
                debug!(pid = child.as_raw(), %errno, "waitpid on intermediate child failed");
                return;
            }
            Ok(_) => return,
        }
    }
}

fn reset_signal_state() -> nix::Result<()> {
    for sig in Signal::iterator() {
        if matches!(sig, Signal::SIGKILL | Signal::SIGSTOP) {
            continue;
        }
        // SAFETY: installing SIG_DFL registers no handler code.
        unsafe { signal::signal(sig, SigHandler::SigDfl) }?;
    }
    signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None)
}

fn redirect_stdio_to_devnull() -> io::Result<()> {
    let devnull = OpenOptions::new().read(true).write(true).open("/dev/null")?;
    let fd = devnull.as_raw_fd();

    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if fd != target {
            dup2(fd, target)?;
        }
    }

    // /dev/null landed on 0-2 itself only if those were closed; keep it open,
    // including across an exec from the body.
    if fd <= libc::STDERR_FILENO {
        clear_cloexec(fd)?;
        std::mem::forget(devnull);
    }
    Ok(())
}

fn clear_cloexec(fd: RawFd) -> nix::Result<()> {
    fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())).map(drop)
}
