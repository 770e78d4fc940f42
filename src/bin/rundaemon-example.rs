#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Reference daemon: launch the signal run loop as a singleton.
//!
//! ```text
//! $ rundaemon-example --lock /tmp/example.pid
//! Parent: 4120, Daemon: 4122
//! $ rundaemon-example --lock /tmp/example.pid
//! Daemon already running.
//! $ kill -TERM "$(cat /tmp/example.pid)"
//! ```

use std::process::ExitCode;

#[cfg(unix)]
fn main() -> ExitCode {
    example::main()
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    eprintln!("Cannot start daemon: daemonization is not supported on this platform");
    ExitCode::FAILURE
}

#[cfg(unix)]
mod example {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use anyhow::{Context, Result};
    use clap::Parser;
    use rundaemon_core::{DaemonConfig, DaemonExitStatus, DaemonFlags, DaemonRequest, LaunchOutcome};
    use rundaemon_observe::LogConfig;
    use rundaemon_signal::{RunLoopConfig, Signal, parse_signal, run_signal_loop};
    use serde::Deserialize;

    /// Launch the reference signal-loop daemon.
    #[derive(Debug, Parser)]
    #[command(name = "rundaemon-example")]
    #[command(about = "Run a singleton daemon that stops on SIGTERM and reloads on SIGHUP")]
    #[command(version)]
    struct Cli {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Lock file path; receives the daemon pid
        #[arg(short, long)]
        lock: Option<PathBuf>,

        /// Syslog identity
        #[arg(long)]
        ident: Option<String>,

        /// Keep the launcher's working directory
        #[arg(long)]
        no_chdir: bool,

        /// Keep the launcher's stdin, stdout and stderr
        #[arg(long)]
        no_redirect: bool,

        /// Do not send log records to syslog
        #[arg(long)]
        no_syslog: bool,

        /// Also intercept this signal (repeatable)
        #[arg(long, value_name = "SIGNAL", value_parser = parse_signal_arg)]
        intercept: Vec<Signal>,
    }

    fn parse_signal_arg(name: &str) -> Result<Signal, String> {
        parse_signal(name).map_err(|e| e.to_string())
    }

    /// On-disk layout: the daemon settings at top level, the loop under
    /// `[signals]`.
    #[derive(Debug, Default, Deserialize)]
    struct ExampleConfig {
        #[serde(flatten)]
        daemon: DaemonConfig,
        #[serde(default)]
        signals: RunLoopConfig,
    }

    impl ExampleConfig {
        fn load(cli: &Cli) -> Result<Self> {
            let mut config: Self = match &cli.config {
                Some(path) => {
                    let text = std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    toml::from_str(&text)
                        .with_context(|| format!("failed to parse {}", path.display()))?
                }
                None => Self::default(),
            };

            // command line wins over the file
            if let Some(lock) = &cli.lock {
                config.daemon.lock_path.clone_from(lock);
            }
            if let Some(ident) = &cli.ident {
                config.daemon.ident.clone_from(ident);
            }

            let flags = config.daemon.flags;
            config.daemon.flags = DaemonFlags::builder()
                .chdir_root(flags.chdir_root() && !cli.no_chdir)
                .redirect_stdio(flags.redirect_stdio() && !cli.no_redirect)
                .reset_signals(flags.reset_signals())
                .umask(flags.umask())
                .build();

            if !cli.intercept.is_empty() {
                let signals = &config.signals;
                let mut builder = RunLoopConfig::builder()
                    .terminate(signals.terminate())
                    .reload(signals.reload())
                    .wait_timeout(signals.wait_timeout());
                for &sig in signals.intercept().iter().chain(&cli.intercept) {
                    builder = builder.intercept(sig);
                }
                config.signals = builder.build();
            }

            config.daemon.validate().context("invalid daemon configuration")?;
            config.signals.validate().context("invalid signal configuration")?;
            Ok(config)
        }
    }

    pub(crate) fn main() -> ExitCode {
        let cli = Cli::parse();

        let config = match ExampleConfig::load(&cli) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Cannot start daemon: {e:#}");
                return ExitCode::FAILURE;
            }
        };

        let log = LogConfig::builder()
            .ident(config.daemon.ident.as_str())
            .syslog(!cli.no_syslog)
            .build();
        if let Err(e) = rundaemon_observe::init(&log) {
            if e.is_syslog() {
                eprintln!("warning: {e}; logging to stderr only");
                let _ = rundaemon_observe::init(&log.without_syslog());
            }
        }

        let ExampleConfig { daemon, signals } = config;
        let mut status = DaemonExitStatus::default();
        let outcome = DaemonRequest::new(daemon.lock_path, run_signal_loop, signals)
            .flags(daemon.flags)
            .launch(&mut status);

        match &outcome {
            LaunchOutcome::RanAsDaemon => return status.into(),
            LaunchOutcome::Launched(pid) => {
                println!("Parent: {}, Daemon: {pid}", std::process::id());
            }
            LaunchOutcome::AlreadyRunning => eprintln!("Daemon already running."),
            LaunchOutcome::LowLevelError(e) => eprintln!("Cannot start daemon: {e}"),
        }

        outcome
            .launcher_exit_code()
            .map_or(ExitCode::FAILURE, ExitCode::from)
    }

}
