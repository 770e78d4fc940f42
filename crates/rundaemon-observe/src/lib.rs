// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # rundaemon-observe
//!
//! Logging for daemons launched with `rundaemon-core`.
//!
//! A daemon has no terminal once its standard streams point at `/dev/null`,
//! so status lines go to the system log. This crate builds a `tracing`
//! subscriber with:
//!
//! - an `EnvFilter` (default `info`, overridable with `RUST_LOG`);
//! - a `fmt` layer on stderr for the launcher's own diagnostics;
//! - a [`SyslogLayer`] writing `<PRI>IDENT[PID]: message` records with
//!   facility `daemon` to `/dev/log`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rundaemon_observe::{LogConfig, init};
//!
//! let config = LogConfig::builder().ident("vigil").build();
//! if let Err(e) = init(&config) {
//!     eprintln!("{e}; continuing without syslog");
//!     init(&config.without_syslog()).ok();
//! }
//! tracing::info!("ready");
//! ```
//!
//! Install the subscriber before launching: the syslog socket is inherited
//! by the daemon and the pid is read per record.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod subscriber;
#[cfg(unix)]
mod syslog;

pub use error::{ObserveError, Result};
pub use subscriber::{LogConfig, LogConfigBuilder, init, subscriber};
#[cfg(unix)]
pub use syslog::{DEFAULT_SYSLOG_PATH, SYSLOG_PATH_ENV, SyslogLayer, syslog_path_from_env};
pub use tracing::level_filters::LevelFilter;
