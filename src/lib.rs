//! rundaemon: singleton daemons with a signal-driven run loop.
//!
//! Umbrella crate over the workspace:
//!
//! - [`core`]: [`launch`](rundaemon_core::launch) a body as a detached
//!   daemon, guarded by an `flock`'d pid file;
//! - [`signal`]: the reference daemon body, a `signalfd` run loop that stops
//!   on `SIGTERM` and reloads on `SIGHUP`;
//! - [`observe`]: `tracing` subscriber with syslog output.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rundaemon::prelude::*;
//!
//! let mut status = DaemonExitStatus::default();
//! match launch(
//!     DaemonFlags::default(),
//!     run_signal_loop,
//!     RunLoopConfig::default(),
//!     &mut status,
//!     "/tmp/example.pid",
//! ) {
//!     LaunchOutcome::RanAsDaemon => std::process::exit(status.code()),
//!     LaunchOutcome::Launched(pid) => println!("Daemon: {pid}"),
//!     LaunchOutcome::AlreadyRunning => eprintln!("Daemon already running."),
//!     LaunchOutcome::LowLevelError(e) => eprintln!("Cannot start daemon: {e}"),
//! }
//! ```

pub use rundaemon_core as core;
pub use rundaemon_observe as observe;
pub use rundaemon_signal as signal;

/// Prelude module for common imports.
pub mod prelude {
    pub use rundaemon_core::{
        DaemonConfig, DaemonExitStatus, DaemonFlags, DaemonRequest, LaunchError, LaunchOutcome,
        Pid, launch,
    };
    pub use rundaemon_observe::{LogConfig, init as init_logging};
    #[cfg(unix)]
    pub use rundaemon_signal::{
        IgnoreReload, ReloadHandler, RunLoop, RunLoopConfig, Signal, run_signal_loop,
    };
}
