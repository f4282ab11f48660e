use std::io;
use std::process::ExitCode;

use bandcamp_cli::cli::Args;
use bandcamp_cli::commands;
use bandcamp_cli::config::{load_dotenv, AppConfig};
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    load_dotenv();
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = AppConfig::from_args(&args);
    match commands::run(config, args.command, &mut io::stdout().lock()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}
