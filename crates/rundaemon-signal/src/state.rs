//! Run loop state machine.
//!
//! ```text
//!            terminate signal / wait failure
//! Running ──────────────────────────────────▶ Stopped
//!   │  ▲
//!   └──┘ reload signal, other signal, timeout
//! ```
//!
//! `Stopped` is terminal: once reached, further events are ignored.

use nix::sys::signal::Signal;
use rundaemon_core::DaemonExitStatus;
use tracing::{error, info, trace, warn};

use crate::config::RunLoopConfig;
use crate::error::SignalError;

/// Run loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for signals.
    Running,
    /// Finished; the exit status is final.
    Stopped,
}

/// Something the wait primitive produced.
#[derive(Debug)]
pub enum LoopEvent {
    /// A signal was read from the descriptor.
    Signal(Signal),
    /// A signal number with no [`Signal`] equivalent (e.g. realtime).
    Unrecognized(i32),
    /// The wait timed out with nothing pending.
    Timeout,
    /// Waiting or reading failed.
    WaitFailed(SignalError),
}

impl LoopEvent {
    /// Event for a raw signal number.
    #[must_use]
    pub fn from_raw(signo: i32) -> Self {
        Signal::try_from(signo).map_or(Self::Unrecognized(signo), Self::Signal)
    }
}

/// Callback for the reload signal.
pub trait ReloadHandler {
    /// Called once per reload signal received, on the loop's thread.
    fn reload(&mut self);
}

impl<F: FnMut()> ReloadHandler for F {
    fn reload(&mut self) {
        self();
    }
}

/// Reload handler that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreReload;

impl ReloadHandler for IgnoreReload {
    fn reload(&mut self) {}
}

/// Pure dispatch of [`LoopEvent`]s; owns the exit status.
#[derive(Debug)]
pub struct StateMachine<H> {
    state: RunState,
    terminate: Signal,
    reload: Signal,
    exit_status: DaemonExitStatus,
    handler: H,
}

impl<H: ReloadHandler> StateMachine<H> {
    /// Creates a machine in [`RunState::Running`].
    pub const fn new(terminate: Signal, reload: Signal, handler: H) -> Self {
        Self {
            state: RunState::Running,
            terminate,
            reload,
            exit_status: DaemonExitStatus::SUCCESS,
            handler,
        }
    }

    /// Creates a machine for the signals named in `config`.
    pub const fn from_config(config: &RunLoopConfig, handler: H) -> Self {
        Self::new(config.terminate(), config.reload(), handler)
    }

    /// Apply one event and return the resulting state.
    pub fn handle(&mut self, event: LoopEvent) -> RunState {
        if self.state == RunState::Stopped {
            return RunState::Stopped;
        }

        match event {
            LoopEvent::Signal(sig) if sig == self.terminate => {
                info!(signal = %sig, "Got {sig}, stopping");
                self.stop(DaemonExitStatus::SUCCESS);
            }
            LoopEvent::Signal(sig) if sig == self.reload => {
                info!(signal = %sig, "Got {sig}, reloading");
                self.handler.reload();
            }
            LoopEvent::Signal(sig) => {
                warn!(signal = %sig, "Got unexpected signal {sig}, ignoring");
            }
            LoopEvent::Unrecognized(signo) => {
                warn!(signo, "Got unexpected signal {signo}, ignoring");
            }
            LoopEvent::Timeout => trace!("wait timed out"),
            LoopEvent::WaitFailed(err) => {
                error!(error = %err, errno = err.errno(), "Waiting for signals failed");
                self.stop(DaemonExitStatus::FAILURE);
            }
        }

        self.state
    }

    fn stop(&mut self, status: DaemonExitStatus) {
        self.exit_status = status;
        self.state = RunState::Stopped;
    }

    /// Current state.
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Exit status; final once the state is [`RunState::Stopped`].
    pub const fn exit_status(&self) -> DaemonExitStatus {
        self.exit_status
    }

    /// Consumes the machine, returning the reload handler.
    pub fn into_handler(self) -> H {
        self.handler
    }
}
