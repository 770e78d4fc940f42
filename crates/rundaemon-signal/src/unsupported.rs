//! Fallback for Unix platforms without `signalfd(2)`.

use rundaemon_core::DaemonExitStatus;
use tracing::error;

use crate::config::RunLoopConfig;
use crate::error::SignalError;
use crate::state::ReloadHandler;

/// Run loop stand-in; [`run`](Self::run) reports failure immediately.
#[derive(Debug)]
pub struct RunLoop<H> {
    config: RunLoopConfig,
    handler: H,
}

impl<H: ReloadHandler> RunLoop<H> {
    /// Creates a run loop.
    pub const fn new(config: RunLoopConfig, handler: H) -> Self {
        Self { config, handler }
    }

    /// Logs [`SignalError::Unsupported`] and returns a failure status.
    pub fn run(self) -> DaemonExitStatus {
        let Self { config, handler } = self;
        drop((config, handler));
        error!(error = %SignalError::Unsupported, "Cannot set up signal handling");
        DaemonExitStatus::FAILURE
    }
}
