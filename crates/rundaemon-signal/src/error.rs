//! Error types for the signal run loop.

/// Failure while setting up or waiting in the run loop.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The signals of interest could not be blocked.
    #[cfg(unix)]
    #[error("failed to block signals: {0}")]
    Block(nix::errno::Errno),

    /// The signal descriptor could not be opened.
    #[cfg(unix)]
    #[error("failed to open signal descriptor: {0}")]
    Open(nix::errno::Errno),

    /// Waiting on the signal descriptor failed (including `EINTR`).
    #[cfg(unix)]
    #[error("failed to wait for signals: {0}")]
    Wait(nix::errno::Errno),

    /// Reading a pending signal from the descriptor failed.
    #[cfg(unix)]
    #[error("failed to read signal: {0}")]
    Read(nix::errno::Errno),

    /// A configured signal name is not recognized.
    #[error("unknown signal name: {0}")]
    UnknownSignal(String),

    /// A configured signal cannot be intercepted.
    #[error("signal {0} cannot be intercepted")]
    Uncatchable(String),

    /// Terminate and reload name the same signal.
    #[error("terminate and reload signals must differ (both {0})")]
    Conflict(String),

    /// `signalfd(2)` is not available on this platform.
    #[error("signal descriptors are not supported on this platform")]
    Unsupported,
}

impl SignalError {
    /// Raw OS error code behind this failure, if any.
    #[must_use]
    pub const fn errno(&self) -> Option<i32> {
        match self {
            #[cfg(unix)]
            Self::Block(e) | Self::Open(e) | Self::Wait(e) | Self::Read(e) => Some(*e as i32),
            _ => None,
        }
    }

    /// Returns true for errors in the configuration rather than the OS.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::UnknownSignal(_) | Self::Uncatchable(_) | Self::Conflict(_)
        )
    }
}
