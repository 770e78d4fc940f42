//! Subscriber assembly.

use std::path::PathBuf;

use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

use crate::error::{ObserveError, Result};
#[cfg(unix)]
use crate::syslog::{SyslogLayer, syslog_path_from_env};

/// Where log records go and at what level.
///
/// `RUST_LOG` directives, when set, take precedence over `default_level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    ident: String,
    syslog: bool,
    syslog_path: Option<PathBuf>,
    stderr: bool,
    default_level: LevelFilter,
}

impl LogConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::new()
    }

    /// Syslog identity.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Whether records are sent to syslog.
    #[must_use]
    pub const fn syslog(&self) -> bool {
        self.syslog
    }

    /// Whether records are written to stderr.
    #[must_use]
    pub const fn stderr(&self) -> bool {
        self.stderr
    }

    /// Level used when `RUST_LOG` is unset.
    #[must_use]
    pub const fn default_level(&self) -> LevelFilter {
        self.default_level
    }

    /// Syslog socket: the explicit path, else `RUNDAEMON_SYSLOG_PATH`, else
    /// `/dev/log`.
    #[cfg(unix)]
    #[must_use]
    pub fn syslog_path(&self) -> PathBuf {
        self.syslog_path.clone().unwrap_or_else(syslog_path_from_env)
    }

    /// The same configuration with syslog output turned off.
    #[must_use]
    pub fn without_syslog(mut self) -> Self {
        self.syslog = false;
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfigBuilder::new().build()
    }
}

/// Builder for [`LogConfig`].
#[derive(Debug, Clone)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    /// Create a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LogConfig {
                ident: "EXAMPLE".to_string(),
                syslog: true,
                syslog_path: None,
                stderr: true,
                default_level: LevelFilter::INFO,
            },
        }
    }

    /// Syslog identity.
    ///
    /// Default: `"EXAMPLE"`
    #[must_use]
    pub fn ident(mut self, ident: impl Into<String>) -> Self {
        self.config.ident = ident.into();
        self
    }

    /// Send records to syslog.
    ///
    /// Default: `true`
    #[must_use]
    pub const fn syslog(mut self, enabled: bool) -> Self {
        self.config.syslog = enabled;
        self
    }

    /// Explicit syslog socket path.
    ///
    /// Default: `RUNDAEMON_SYSLOG_PATH`, else `/dev/log`
    #[must_use]
    pub fn syslog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.syslog_path = Some(path.into());
        self
    }

    /// Write records to stderr.
    ///
    /// Default: `true`
    #[must_use]
    pub const fn stderr(mut self, enabled: bool) -> Self {
        self.config.stderr = enabled;
        self
    }

    /// Level used when `RUST_LOG` is unset.
    ///
    /// Default: `INFO`
    #[must_use]
    pub const fn default_level(mut self, level: LevelFilter) -> Self {
        self.config.default_level = level;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> LogConfig {
        self.config
    }
}

impl Default for LogConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a subscriber for `config` without installing it.
///
/// # Errors
/// Returns [`ObserveError::Syslog`] if syslog output is enabled and the
/// socket cannot be reached.
pub fn subscriber(config: &LogConfig) -> Result<Box<dyn Subscriber + Send + Sync>> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.default_level.into())
        .from_env_lossy();

    let stderr_layer = config.stderr.then(|| {
        tracing_fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    #[cfg(unix)]
    let syslog_layer = if config.syslog {
        Some(SyslogLayer::connect(&config.ident, config.syslog_path())?)
    } else {
        None
    };
    #[cfg(not(unix))]
    let syslog_layer: Option<tracing_subscriber::layer::Identity> = None;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(syslog_layer);
    Ok(Box::new(registry))
}

/// Build and install the global subscriber.
///
/// # Errors
/// Returns [`ObserveError::Syslog`] as [`subscriber`] does, or
/// [`ObserveError::Init`] if a global subscriber is already set.
pub fn init(config: &LogConfig) -> Result<()> {
    tracing::subscriber::set_global_default(subscriber(config)?)
        .map_err(|e| ObserveError::init(e.to_string()))
}
