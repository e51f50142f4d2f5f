use clap::Parser;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use vpptool::cli::{Cli, workflow};

const APP_NAME: &str = env!("CARGO_PKG_NAME");

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };

    // warnings and errors go to stderr, progress to stdout
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(writer)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.debug);

    match workflow::run(
        cli.command.stage(),
        cli.command.name(),
        &cli.options,
        &cli.config_dir,
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{APP_NAME}: {e:#}");
            ExitCode::FAILURE
        }
    }
}
