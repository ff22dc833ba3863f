/*!
 * IPC Probe - Main Entry Point
 *
 * Runs one side of the rendezvous and exits with a status code describing
 * the outcome, so a harness can start two instances and compare.
 */

use clap::Parser;
use ipc_probe::{init_tracing, run, Cli, ConsoleObserver, ExitStatus, ProbeConfig, ProbeError};
use std::process::ExitCode;
use tracing::info;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let status = if e.use_stderr() {
                ExitStatus::Usage
            } else {
                // --help and --version
                ExitStatus::Success
            };
            let _ = e.print();
            return status.into();
        }
    };

    init_tracing();

    match ProbeConfig::from_cli(cli).and_then(|config| {
        info!(backend = %config.backend, name = %config.name, timeout_s = config.timeout.as_secs(), "Starting probe");
        run(&config, &ConsoleObserver)
    }) {
        Ok(_) => {
            println!("Success!");
            ExitStatus::Success.into()
        }
        Err(e) => report(e),
    }
}

fn report(err: ProbeError) -> ExitCode {
    let status = err.exit_status();
    eprintln!("{:?}", miette::Report::new(err));
    status.into()
}
