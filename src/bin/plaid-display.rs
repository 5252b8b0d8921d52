//! Streams a Plaid account summary to a serial display.
//!
//! Configuration comes from the environment (see `plaid_display::config`);
//! a `.env` file in the working directory is loaded first, or the file named
//! by `PLAID_DISPLAY_ENV_FILE`.
#![allow(
    clippy::exit,
    reason = "a second interrupt exits without waiting for an in-flight request"
)]

use std::io::{self, Write as _};
use std::process::ExitCode;

use owo_colors::OwoColorize as _;
use plaid_display::config::{self, Config};
use plaid_display::delivery;
use plaid_display::error::{BridgeError, ErrorClass};
use plaid_display::shutdown;

/// Exit status for a forced stop, as a shell reports SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Loads the configuration, preferring an explicitly named env file.
fn load_config() -> plaid_display::error::Result<Config> {
    match std::env::var(config::ENV_FILE_ENV) {
        Ok(path) if !path.is_empty() => Config::from_env_file(path),
        _ => {
            let _dotenv = dotenvy::dotenv();
            Config::from_env()
        }
    }
}

/// Prints a fatal error with an operator hint where one helps.
fn report_fatal(err: &BridgeError) -> io::Result<()> {
    let mut out = io::stderr().lock();
    writeln!(out, "{} {err}", "error:".red().bold())?;
    let hint = match err.class() {
        ErrorClass::Configuration => Some(format!(
            "check {} and the PLAID_DISPLAY_* variables in the environment or .env",
            config::TOKEN_ENV.bold()
        )),
        ErrorClass::SerialUnavailable => Some(format!(
            "check the cable or point {} at the right device",
            config::SERIAL_PORT_ENV.bold()
        )),
        ErrorClass::RemoteFetch | ErrorClass::Cycle => None,
    };
    if let Some(hint) = hint {
        writeln!(out, "  {} {hint}", "hint:".cyan())?;
    }
    Ok(())
}

/// Runs the bridge until interrupted or a fatal error occurs.
fn run() -> plaid_display::error::Result<delivery::LoopReport> {
    let config = load_config()?;
    let client = config.client()?;

    let (mut trigger, waiter) = shutdown::channel();
    if let Err(err) = ctrlc::set_handler(move || {
        if trigger.request() {
            tracing::warn!("interrupted again, exiting without finishing the current cycle");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        tracing::info!("stopping after the current cycle, press Ctrl-C again to exit now");
    }) {
        tracing::warn!(error = %err, "cannot install interrupt handler, Ctrl-C will not stop cleanly");
    }

    tracing::info!(
        api = %config.api_base_url,
        port = %config.serial.path,
        "starting display bridge"
    );
    delivery::serve(&config, client, waiter)
}

/// Entry point.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(report) => {
            tracing::info!(
                delivered = report.delivered,
                fetch_failures = report.fetch_failures,
                cycle_failures = report.cycle_failures,
                "stopped by user"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "display bridge stopped");
            if let Err(io_err) = report_fatal(&err) {
                tracing::debug!(error = %io_err, "cannot write to stderr");
            }
            ExitCode::FAILURE
        }
    }
}
