//! Logging setup error types.

use std::io;
use std::path::PathBuf;

/// Result type alias for logging setup.
pub type Result<T> = std::result::Result<T, ObserveError>;

/// Logging setup errors.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// The system log socket could not be reached.
    #[error("cannot connect to syslog at {}: {source}", path.display())]
    Syslog {
        /// Socket path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A global subscriber is already installed.
    #[error("cannot install log subscriber: {0}")]
    Init(String),
}

impl ObserveError {
    /// Creates an init error.
    #[must_use]
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Returns true if only the syslog output failed; the caller may retry
    /// without it.
    #[must_use]
    pub const fn is_syslog(&self) -> bool {
        matches!(self, Self::Syslog { .. })
    }
}
