//! Tracing layer that writes to the local system log.
//!
//! Records go to the syslog datagram socket in the traditional local format
//! `<PRI>IDENT[PID]: message`, with facility `daemon`. The pid is looked up
//! per event, so a layer installed before `fork` tags daemon records with the
//! daemon's pid.

use std::fmt::{self, Write as _};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::error::{ObserveError, Result};

/// Default syslog socket.
pub const DEFAULT_SYSLOG_PATH: &str = "/dev/log";

/// Environment variable overriding the syslog socket path.
pub const SYSLOG_PATH_ENV: &str = "RUNDAEMON_SYSLOG_PATH";

/// `LOG_DAEMON` facility code.
const FACILITY_DAEMON: u8 = 3;

/// Socket path from [`SYSLOG_PATH_ENV`], else [`DEFAULT_SYSLOG_PATH`].
#[must_use]
pub fn syslog_path_from_env() -> PathBuf {
    std::env::var_os(SYSLOG_PATH_ENV).map_or_else(|| PathBuf::from(DEFAULT_SYSLOG_PATH), PathBuf::from)
}

/// Syslog output for a `tracing` subscriber.
#[derive(Debug)]
pub struct SyslogLayer {
    sock: UnixDatagram,
    ident: String,
}

impl SyslogLayer {
    /// Connect to the syslog socket at `path`.
    ///
    /// # Errors
    /// Returns [`ObserveError::Syslog`] if the socket cannot be created or
    /// connected.
    pub fn connect(ident: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let syslog_err = |source| ObserveError::Syslog {
            path: path.to_path_buf(),
            source,
        };

        let sock = UnixDatagram::unbound().map_err(syslog_err)?;
        sock.connect(path).map_err(syslog_err)?;

        Ok(Self {
            sock,
            ident: ident.into(),
        })
    }

    /// Identity written before the pid on every record.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.ident
    }
}

impl<S: Subscriber> Layer<S> for SyslogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let record = format_record(
            &self.ident,
            std::process::id(),
            *event.metadata().level(),
            &visitor.finish(event.metadata().target()),
        );
        // the log has nowhere to report its own failures
        let _ = self.sock.send(record.as_bytes());
    }
}

const fn severity(level: Level) -> u8 {
    match level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        Level::DEBUG | Level::TRACE => 7,
    }
}

fn format_record(ident: &str, pid: u32, level: Level, message: &str) -> String {
    let pri = FACILITY_DAEMON * 8 + severity(level);
    format!("<{pri}>{ident}[{pid}]: {message}")
}

/// Collects the message first and then `key=value` for the other fields.
#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: String,
}

impl RecordVisitor {
    fn finish(self, target: &str) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (true, true) => target.to_string(),
            (true, false) => self.fields,
            (false, true) => self.message,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", field.name(), value);
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field, format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field, format_args!("{value:?}"));
        }
    }
}
