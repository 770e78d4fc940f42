//! Block-then-poll run loop over a `signalfd(2)` descriptor.

use std::os::fd::AsFd;
use std::time::Duration;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use rundaemon_core::DaemonExitStatus;
use tracing::{error, info};

use crate::config::RunLoopConfig;
use crate::error::SignalError;
use crate::mask::BlockedSignals;
use crate::state::{LoopEvent, ReloadHandler, RunState, StateMachine};

/// Daemon body that waits for signals until told to stop.
///
/// ```rust,no_run
/// use rundaemon_signal::{RunLoop, RunLoopConfig};
///
/// let mut generation = 0u32;
/// let status = RunLoop::new(RunLoopConfig::default(), || generation += 1).run();
/// std::process::exit(status.code());
/// ```
#[derive(Debug)]
pub struct RunLoop<H> {
    config: RunLoopConfig,
    handler: H,
}

impl<H: ReloadHandler> RunLoop<H> {
    /// Creates a run loop; nothing is blocked until [`run`](Self::run).
    pub const fn new(config: RunLoopConfig, handler: H) -> Self {
        Self { config, handler }
    }

    /// Run until the terminate signal arrives or waiting fails.
    ///
    /// The signals of interest stay blocked only while the loop runs; the
    /// previous mask is restored before returning.
    pub fn run(self) -> DaemonExitStatus {
        let Self { config, handler } = self;
        let pid = std::process::id();
        info!(pid, "daemon started with pid {pid}");

        let status = match Descriptor::open(&config) {
            Ok(mut descriptor) => {
                let mut machine = StateMachine::from_config(&config, handler);
                let timeout = poll_timeout(config.wait_timeout());

                while machine.state() == RunState::Running {
                    for event in descriptor.wait(timeout) {
                        if machine.handle(event) == RunState::Stopped {
                            break;
                        }
                    }
                }
                machine.exit_status()
            }
            Err(err) => {
                error!(error = %err, errno = err.errno(), "Cannot set up signal handling");
                DaemonExitStatus::FAILURE
            }
        };

        let code = status.code();
        info!(code, "daemon stopped with status code {code}");
        status
    }
}

/// Signal descriptor plus the mask that feeds it. Field order is drop order:
/// the descriptor closes before the mask is restored.
struct Descriptor {
    fd: SignalFd,
    _blocked: BlockedSignals,
}

impl Descriptor {
    fn open(config: &RunLoopConfig) -> Result<Self, SignalError> {
        config.validate()?;
        let set = config.signal_set();

        let blocked = BlockedSignals::block(&set)?;
        let fd = SignalFd::with_flags(&set, SfdFlags::SFD_CLOEXEC | SfdFlags::SFD_NONBLOCK)
            .map_err(SignalError::Open)?;
        info!(signals = ?set.iter().collect::<Vec<_>>(), "listening for signals");

        Ok(Self {
            fd,
            _blocked: blocked,
        })
    }

    /// Wait once; return the events in read order.
    fn wait(&mut self, timeout: PollTimeout) -> Vec<LoopEvent> {
        let ready = {
            let mut fds = [PollFd::new(self.fd.as_fd(), PollFlags::POLLIN)];
            poll(&mut fds, timeout)
        };

        match ready {
            Err(errno) => vec![LoopEvent::WaitFailed(SignalError::Wait(errno))],
            Ok(0) => vec![LoopEvent::Timeout],
            Ok(_) => self.drain(),
        }
    }

    fn drain(&mut self) -> Vec<LoopEvent> {
        let mut events = Vec::new();
        loop {
            match self.fd.read_signal() {
                Ok(Some(info)) => events.push(LoopEvent::from_raw(info.ssi_signo as i32)),
                Ok(None) => break,
                Err(errno) => {
                    events.push(LoopEvent::WaitFailed(SignalError::Read(errno)));
                    break;
                }
            }
        }
        events
    }
}

/// Rounds up to whole milliseconds and never below one, so a tiny or zero
/// idle timeout still sleeps instead of spinning on `poll(0)`.
fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        Some(d) => {
            let millis = d.as_nanos().div_ceil(1_000_000).max(1);
            let millis = i32::try_from(millis).unwrap_or(i32::MAX);
            PollTimeout::try_from(millis).unwrap_or(PollTimeout::NONE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::{SigSet, Signal, raise};

    /// Block `sigs` on this thread and raise them so they are pending before
    /// the loop starts. Raised signals are thread-directed, so the loop on
    /// the same thread reads them through its descriptor.
    fn pend(sigs: &[Signal]) -> BlockedSignals {
        let mut set = SigSet::empty();
        for &sig in sigs {
            set.add(sig);
        }
        let guard = BlockedSignals::block(&set).unwrap();
        for &sig in sigs {
            raise(sig).unwrap();
        }
        guard
    }

    #[test]
    fn test_poll_timeout_conversion() {
        assert_eq!(poll_timeout(None), PollTimeout::NONE);
        assert_eq!(
            poll_timeout(Some(Duration::from_millis(1500))),
            PollTimeout::try_from(1500i32).unwrap()
        );
        assert_eq!(
            poll_timeout(Some(Duration::from_secs(u64::MAX))),
            PollTimeout::try_from(i32::MAX).unwrap()
        );
    }

    #[test]
    fn test_poll_timeout_never_zero() {
        let one = PollTimeout::try_from(1i32).unwrap();
        assert_eq!(poll_timeout(Some(Duration::ZERO)), one);
        assert_eq!(poll_timeout(Some(Duration::from_micros(300))), one);
        assert_eq!(
            poll_timeout(Some(Duration::from_micros(1500))),
            PollTimeout::try_from(2i32).unwrap()
        );
    }

    #[test]
    fn test_pending_terminate_stops_with_success() {
        let _pending = pend(&[Signal::SIGTERM]);
        let status = RunLoop::new(RunLoopConfig::default(), crate::IgnoreReload).run();
        assert_eq!(status, DaemonExitStatus::SUCCESS);
    }

    #[test]
    fn test_reload_then_terminate() {
        let _pending = pend(&[Signal::SIGHUP, Signal::SIGTERM]);
        let mut reloads = 0;
        let status = RunLoop::new(RunLoopConfig::default(), || reloads += 1).run();
        assert!(status.is_success());
        assert_eq!(reloads, 1);
    }

    #[test]
    fn test_intercepted_signal_is_consumed() {
        let config = RunLoopConfig::builder()
            .intercept(Signal::SIGUSR1)
            .wait_timeout(Some(Duration::from_millis(10)))
            .build();
        let _pending = pend(&[Signal::SIGUSR1, Signal::SIGTERM]);
        let status = RunLoop::new(config, crate::IgnoreReload).run();
        assert!(status.is_success());
    }

    #[test]
    fn test_mask_restored_after_run() {
        let _pending = pend(&[Signal::SIGTERM]);
        let _ = RunLoop::new(RunLoopConfig::default(), crate::IgnoreReload).run();

        // SIGTERM was blocked by `pend`, SIGHUP only by the loop
        let mask = SigSet::thread_get_mask().unwrap();
        assert!(mask.contains(Signal::SIGTERM));
        assert!(!mask.contains(Signal::SIGHUP));
    }

    #[test]
    fn test_invalid_config_fails_setup() {
        let config = RunLoopConfig::builder().reload(Signal::SIGTERM).build();
        let status = RunLoop::new(config, crate::IgnoreReload).run();
        assert_eq!(status, DaemonExitStatus::FAILURE);
    }
}
