use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use rootd::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(config_error) => {
            report_startup_failure(&format!("configuration error: {config_error}"));
            return ExitCode::FAILURE;
        }
    };

    if let Err(telemetry_error) = rootd::telemetry::initialise(&config) {
        report_startup_failure(&format!("telemetry error: {telemetry_error}"));
        return ExitCode::FAILURE;
    }

    match rootd::run_daemon(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(launch_error) => {
            error!(error = %launch_error, "daemon failed");
            ExitCode::FAILURE
        }
    }
}

/// Reports a failure that happened before telemetry could be installed.
#[expect(clippy::print_stderr, reason = "telemetry is not available yet")]
fn report_startup_failure(message: &str) {
    eprintln!("rootd: {message}");
}
