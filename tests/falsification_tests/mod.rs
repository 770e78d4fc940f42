//! Falsification tests for rundaemon.
//!
//! Daemons started here are reparented to init; tests observe them through
//! the lock file and the syslog socket, never through `waitpid`.

// Allow test-specific patterns that are denied in production code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::needless_borrows_for_generic_args)]

mod signals;
mod singleton;
mod support;
