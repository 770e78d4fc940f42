// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # rundaemon-signal
//!
//! Reference daemon body: wait for signals on a descriptor instead of in
//! asynchronous handlers.
//!
//! The loop blocks the signals it cares about, opens a `signalfd(2)` for
//! them and `poll`s it. Everything a signal triggers happens on the loop's
//! own thread, in ordinary code.
//!
//! | Signal | Effect |
//! |--------|--------|
//! | terminate (`SIGTERM`) | stop, exit status success |
//! | reload (`SIGHUP`) | call the [`ReloadHandler`], keep running |
//! | any other intercepted signal | one warning, keep running |
//!
//! A failed wait (including `EINTR`) stops the loop with a failure status.
//!
//! ```rust,no_run
//! use rundaemon_core::{DaemonExitStatus, DaemonFlags, LaunchOutcome, launch};
//! use rundaemon_signal::{RunLoopConfig, run_signal_loop};
//!
//! let mut status = DaemonExitStatus::default();
//! let outcome = launch(
//!     DaemonFlags::default(),
//!     run_signal_loop,
//!     RunLoopConfig::default(),
//!     &mut status,
//!     "/tmp/example.pid",
//! );
//! if outcome.is_daemon() {
//!     std::process::exit(status.code());
//! }
//! ```
//!
//! Non-realtime signals coalesce: two `SIGHUP`s delivered before the loop
//! wakes up produce one reload.
//!
//! ## Platform Support
//!
//! | Platform | Support |
//! |----------|---------|
//! | Linux, Android | Full |
//! | Other Unix | Configuration only; [`RunLoop::run`] fails |

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod error;

#[cfg(unix)]
mod config;
#[cfg(unix)]
mod mask;
#[cfg(unix)]
mod state;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod runloop;

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
mod unsupported;

pub use error::SignalError;

#[cfg(unix)]
pub use config::{RunLoopConfig, RunLoopConfigBuilder, parse_signal};
#[cfg(unix)]
pub use mask::BlockedSignals;
#[cfg(unix)]
pub use nix::sys::signal::{SigSet, Signal};
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use runloop::RunLoop;
#[cfg(unix)]
pub use state::{IgnoreReload, LoopEvent, ReloadHandler, RunState, StateMachine};
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
pub use unsupported::RunLoop;

/// Run the signal loop with no reload behavior beyond logging.
///
/// Suitable as a daemon body for [`rundaemon_core::launch`].
#[cfg(unix)]
pub fn run_signal_loop(config: RunLoopConfig) -> rundaemon_core::DaemonExitStatus {
    RunLoop::new(config, IgnoreReload).run()
}
