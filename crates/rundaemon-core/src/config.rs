//! Daemon configuration.
//!
//! Validated at load time with clear error messages; every field has a
//! default so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::flags::DaemonFlags;

/// Default lock file location.
pub const DEFAULT_LOCK_PATH: &str = "/tmp/example.pid";

/// Default system log identity.
pub const DEFAULT_IDENT: &str = "EXAMPLE";

/// Launch configuration for one daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Identity used in system log lines (`IDENT[pid]: ...`).
    pub ident: String,

    /// Lock file path; also receives the daemon pid.
    pub lock_path: PathBuf,

    /// Creation behavior.
    pub flags: DaemonFlags,
}

impl DaemonConfig {
    /// Creates a configuration with default flags.
    #[must_use]
    pub fn new(ident: impl Into<String>, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            ident: ident.into(),
            lock_path: lock_path.into(),
            flags: DaemonFlags::default(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if a field is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ident.is_empty() {
            return Err(ConfigError::invalid("ident cannot be empty"));
        }
        if self.ident.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConfigError::invalid(
                "ident must not contain whitespace or control characters",
            ));
        }

        // chdir("/") would silently change what a relative path refers to
        if !self.lock_path.is_absolute() {
            return Err(ConfigError::invalid(format!(
                "lock_path must be absolute: {}",
                self.lock_path.display()
            )));
        }
        if self.lock_path.file_name().is_none() {
            return Err(ConfigError::invalid(format!(
                "lock_path must name a file: {}",
                self.lock_path.display()
            )));
        }

        if let Some(mask) = self.flags.umask() {
            if mask > 0o777 {
                return Err(ConfigError::invalid(format!(
                    "umask {mask:#o} is out of range (max 0o777)"
                )));
            }
        }

        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    /// Returns an error if parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::new(DEFAULT_IDENT, DEFAULT_LOCK_PATH)
    }
}
