//! Daemon creation flags.

use serde::{Deserialize, Serialize};

/// Daemon creation behavior.
///
/// Every toggle is an explicit field; the defaults produce a conventional
/// daemon (root working directory, null stdio, default signal dispositions,
/// umask 0).
///
/// ```rust
/// use rundaemon_core::DaemonFlags;
///
/// let flags = DaemonFlags::builder()
///     .chdir_root(false)     // keep the launcher's working directory
///     .umask(Some(0o027))
///     .build();
/// assert!(flags.redirect_stdio());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)] // independent toggles, not state
pub struct DaemonFlags {
    /// `chdir("/")` so the daemon does not pin a mounted filesystem.
    chdir_root: bool,
    /// Point stdin, stdout and stderr at `/dev/null`.
    redirect_stdio: bool,
    /// Reset every catchable signal to `SIG_DFL` and clear the signal mask.
    reset_signals: bool,
    /// File mode creation mask for the daemon; `None` keeps the inherited one.
    umask: Option<u32>,
}

impl DaemonFlags {
    /// Create a new flags builder.
    #[must_use]
    pub const fn builder() -> DaemonFlagsBuilder {
        DaemonFlagsBuilder::new()
    }

    /// Whether the daemon changes its working directory to `/`.
    #[must_use]
    pub const fn chdir_root(&self) -> bool {
        self.chdir_root
    }

    /// Whether standard streams are redirected to `/dev/null`.
    #[must_use]
    pub const fn redirect_stdio(&self) -> bool {
        self.redirect_stdio
    }

    /// Whether signal dispositions and the signal mask are reset.
    #[must_use]
    pub const fn reset_signals(&self) -> bool {
        self.reset_signals
    }

    /// Umask applied in the daemon, if any.
    #[must_use]
    pub const fn umask(&self) -> Option<u32> {
        self.umask
    }
}

impl Default for DaemonFlags {
    fn default() -> Self {
        DaemonFlagsBuilder::new().build()
    }
}

/// Builder for [`DaemonFlags`].
#[derive(Debug, Clone, Copy)]
pub struct DaemonFlagsBuilder {
    flags: DaemonFlags,
}

impl DaemonFlagsBuilder {
    /// Create a builder with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: DaemonFlags {
                chdir_root: true,
                redirect_stdio: true,
                reset_signals: true,
                umask: Some(0),
            },
        }
    }

    /// Change the working directory to `/`.
    ///
    /// Default: `true`
    #[must_use]
    pub const fn chdir_root(mut self, value: bool) -> Self {
        self.flags.chdir_root = value;
        self
    }

    /// Redirect stdin, stdout and stderr to `/dev/null`.
    ///
    /// Default: `true`. Turning this off is mostly useful for debugging;
    /// writes to a closed terminal will fail with `EIO`.
    #[must_use]
    pub const fn redirect_stdio(mut self, value: bool) -> Self {
        self.flags.redirect_stdio = value;
        self
    }

    /// Reset signal dispositions to default and unblock all signals.
    ///
    /// Default: `true`
    #[must_use]
    pub const fn reset_signals(mut self, value: bool) -> Self {
        self.flags.reset_signals = value;
        self
    }

    /// Umask for the daemon. `None` keeps the launcher's.
    ///
    /// Default: `Some(0)`
    #[must_use]
    pub const fn umask(mut self, value: Option<u32>) -> Self {
        self.flags.umask = value;
        self
    }

    /// Build the flags.
    #[must_use]
    pub const fn build(self) -> DaemonFlags {
        self.flags
    }
}

impl Default for DaemonFlagsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
