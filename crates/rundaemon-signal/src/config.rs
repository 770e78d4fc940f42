//! Run loop configuration.
//!
//! Signals are written by name in configuration files (`"SIGTERM"`, or the
//! short form `"TERM"`), and the optional idle timeout as a humantime
//! duration (`"30s"`).

use std::str::FromStr;
use std::time::Duration;

use nix::sys::signal::{SigSet, Signal};
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Which signals the run loop listens for and how long each wait may last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunLoopConfig {
    #[serde(with = "signal_name")]
    terminate: Signal,

    #[serde(with = "signal_name")]
    reload: Signal,

    #[serde(with = "signal_names")]
    intercept: Vec<Signal>,

    #[serde(with = "humantime_serde")]
    wait_timeout: Option<Duration>,
}

impl RunLoopConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> RunLoopConfigBuilder {
        RunLoopConfigBuilder::new()
    }

    /// Signal that stops the loop with a success status.
    #[must_use]
    pub const fn terminate(&self) -> Signal {
        self.terminate
    }

    /// Signal that triggers the reload handler.
    #[must_use]
    pub const fn reload(&self) -> Signal {
        self.reload
    }

    /// Additional signals that are consumed and reported as unexpected.
    #[must_use]
    pub fn intercept(&self) -> &[Signal] {
        &self.intercept
    }

    /// Upper bound on a single wait; `None` waits indefinitely.
    #[must_use]
    pub const fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }

    /// Every signal the loop blocks and reads.
    #[must_use]
    pub fn signal_set(&self) -> SigSet {
        let mut set = SigSet::empty();
        set.add(self.terminate);
        set.add(self.reload);
        for &sig in &self.intercept {
            set.add(sig);
        }
        set
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`SignalError::Conflict`] if terminate and reload are the same
    /// signal, or [`SignalError::Uncatchable`] for `SIGKILL`/`SIGSTOP`.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.terminate == self.reload {
            return Err(SignalError::Conflict(self.terminate.to_string()));
        }

        let all = [self.terminate, self.reload]
            .into_iter()
            .chain(self.intercept.iter().copied());
        for sig in all {
            if matches!(sig, Signal::SIGKILL | Signal::SIGSTOP) {
                return Err(SignalError::Uncatchable(sig.to_string()));
            }
        }

        Ok(())
    }
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        RunLoopConfigBuilder::new().build()
    }
}

/// Builder for [`RunLoopConfig`].
#[derive(Debug, Clone)]
pub struct RunLoopConfigBuilder {
    config: RunLoopConfig,
}

impl RunLoopConfigBuilder {
    /// Create a builder with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            config: RunLoopConfig {
                terminate: Signal::SIGTERM,
                reload: Signal::SIGHUP,
                intercept: Vec::new(),
                wait_timeout: None,
            },
        }
    }

    /// Signal that stops the loop.
    ///
    /// Default: `SIGTERM`
    #[must_use]
    pub const fn terminate(mut self, sig: Signal) -> Self {
        self.config.terminate = sig;
        self
    }

    /// Signal that triggers a reload.
    ///
    /// Default: `SIGHUP`
    #[must_use]
    pub const fn reload(mut self, sig: Signal) -> Self {
        self.config.reload = sig;
        self
    }

    /// Also intercept `sig`; each delivery logs one warning.
    #[must_use]
    pub fn intercept(mut self, sig: Signal) -> Self {
        if !self.config.intercept.contains(&sig) {
            self.config.intercept.push(sig);
        }
        self
    }

    /// Bound each wait. Timeouts are idle ticks and never stop the loop.
    ///
    /// Default: `None`
    #[must_use]
    pub const fn wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> RunLoopConfig {
        self.config
    }
}

impl Default for RunLoopConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a signal name, with or without the `SIG` prefix, ignoring case.
///
/// # Errors
/// Returns [`SignalError::UnknownSignal`] if the name is not a signal.
pub fn parse_signal(name: &str) -> Result<Signal, SignalError> {
    let upper = name.trim().to_ascii_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    Signal::from_str(&full).map_err(|_| SignalError::UnknownSignal(name.to_string()))
}

mod signal_name {
    use nix::sys::signal::Signal;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(sig: &Signal, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(sig.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Signal, D::Error> {
        let name = String::deserialize(d)?;
        super::parse_signal(&name).map_err(de::Error::custom)
    }
}

mod signal_names {
    use nix::sys::signal::Signal;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(sigs: &[Signal], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(sigs.iter().map(|sig| sig.as_str()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Signal>, D::Error> {
        Vec::<String>::deserialize(d)?
            .iter()
            .map(|name| super::parse_signal(name).map_err(de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunLoopConfig::default();
        assert_eq!(config.terminate(), Signal::SIGTERM);
        assert_eq!(config.reload(), Signal::SIGHUP);
        assert!(config.intercept().is_empty());
        assert_eq!(config.wait_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_signal_set_contains_everything() {
        let config = RunLoopConfig::builder().intercept(Signal::SIGUSR1).build();
        let set = config.signal_set();
        assert!(set.contains(Signal::SIGTERM));
        assert!(set.contains(Signal::SIGHUP));
        assert!(set.contains(Signal::SIGUSR1));
        assert!(!set.contains(Signal::SIGUSR2));
    }

    #[test]
    fn test_intercept_deduplicates() {
        let config = RunLoopConfig::builder()
            .intercept(Signal::SIGUSR1)
            .intercept(Signal::SIGUSR1)
            .build();
        assert_eq!(config.intercept(), &[Signal::SIGUSR1]);
    }

    #[test]
    fn test_parse_signal_forms() {
        assert_eq!(parse_signal("SIGTERM").unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal("hup").unwrap(), Signal::SIGHUP);
        assert_eq!(parse_signal(" Usr2 ").unwrap(), Signal::SIGUSR2);
        assert!(parse_signal("SIGNOPE").unwrap_err().is_config());
    }

    #[test]
    fn test_validate_conflict() {
        let config = RunLoopConfig::builder().reload(Signal::SIGTERM).build();
        assert!(matches!(config.validate(), Err(SignalError::Conflict(_))));
    }

    #[test]
    fn test_validate_uncatchable() {
        let config = RunLoopConfig::builder().intercept(Signal::SIGKILL).build();
        assert!(matches!(config.validate(), Err(SignalError::Uncatchable(_))));
    }

    #[test]
    fn test_deserialize_names_and_timeout() {
        let config: RunLoopConfig = toml::from_str(
            r#"
            terminate = "INT"
            intercept = ["SIGUSR1", "usr2"]
            wait_timeout = "250ms"
            "#,
        )
        .unwrap();

        assert_eq!(config.terminate(), Signal::SIGINT);
        assert_eq!(config.reload(), Signal::SIGHUP);
        assert_eq!(config.intercept(), &[Signal::SIGUSR1, Signal::SIGUSR2]);
        assert_eq!(config.wait_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_deserialize_unknown_signal_fails() {
        let result: Result<RunLoopConfig, _> = toml::from_str("reload = \"SIGWHAT\"\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("SIGWHAT"));
    }

    #[test]
    fn test_serialize_uses_names() {
        let config = RunLoopConfig::builder().intercept(Signal::SIGUSR1).build();
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("terminate = \"SIGTERM\""));
        assert!(text.contains("\"SIGUSR1\""));
    }
}
