//! Test fixture for the cross-process tests in `tests/`.
//!
//! Prints exactly one line on stdout in the launcher:
//!
//! - `launched <daemon pid>`
//! - `already-running`
//! - `error <errno or -1> <message>`

use std::process::ExitCode;

#[cfg(unix)]
fn main() -> ExitCode {
    probe::main()
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    println!("error -1 unsupported");
    ExitCode::FAILURE
}

#[cfg(unix)]
mod probe {
    use std::path::PathBuf;
    use std::process::ExitCode;
    use std::time::Duration;

    use clap::{Parser, Subcommand};
    use rundaemon_core::{DaemonExitStatus, DaemonFlags, LaunchOutcome, launch};
    use rundaemon_observe::{LogConfig, syslog_path_from_env};
    use rundaemon_signal::{RunLoopConfig, Signal, run_signal_loop};

    #[derive(Debug, Parser)]
    #[command(name = "launch-probe")]
    struct Probe {
        /// Lock file path
        lock: PathBuf,

        #[command(subcommand)]
        mode: Mode,
    }

    #[derive(Debug, Clone, Subcommand)]
    enum Mode {
        /// Return `code` from the body after `hold_ms`
        Exit {
            code: i32,
            #[arg(long, default_value_t = 0)]
            hold_ms: u64,
        },
        /// Run the signal loop, also intercepting SIGUSR1
        Loop,
    }

    fn body(mode: Mode) -> DaemonExitStatus {
        match mode {
            Mode::Exit { code, hold_ms } => {
                std::thread::sleep(Duration::from_millis(hold_ms));
                DaemonExitStatus::new(code)
            }
            Mode::Loop => run_signal_loop(RunLoopConfig::builder().intercept(Signal::SIGUSR1).build()),
        }
    }

    pub(crate) fn main() -> ExitCode {
        let probe = Probe::parse();

        // syslog only when a test points us at a socket
        let syslog = std::env::var_os(rundaemon_observe::SYSLOG_PATH_ENV).is_some();
        let log = LogConfig::builder()
            .ident("PROBE")
            .stderr(false)
            .syslog(syslog)
            .syslog_path(syslog_path_from_env())
            .build();
        let _ = rundaemon_observe::init(&log);

        let mut status = DaemonExitStatus::default();
        let outcome = launch(DaemonFlags::default(), body, probe.mode, &mut status, &probe.lock);

        match &outcome {
            LaunchOutcome::RanAsDaemon => return status.into(),
            LaunchOutcome::Launched(pid) => println!("launched {pid}"),
            LaunchOutcome::AlreadyRunning => println!("already-running"),
            LaunchOutcome::LowLevelError(e) => println!("error {} {e}", e.errno().unwrap_or(-1)),
        }

        outcome
            .launcher_exit_code()
            .map_or(ExitCode::FAILURE, ExitCode::from)
    }
}
