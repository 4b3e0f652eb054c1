// folio CLI entry point.

use std::process::ExitCode as ProcessExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod credentials;
mod exit_code;
mod output;

use exit_code::ExitCode;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "folio", about = "Shared documents for your organization")]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,
    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> ProcessExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::detect(cli.global.json);
    match commands::run(cli.command, &cli.global) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => {
            output::print_anyhow_error(format, &error);
            ExitCode::from_error(&error).into()
        }
    }
}
