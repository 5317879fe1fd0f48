//! Notegraph CLI entry point

use std::process::ExitCode;

use clap::Parser;
use notegraph_cli::{run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut stdout = std::io::stdout().lock();
    match run(&cli, &mut stdout) {
        Ok(status) => ExitCode::from(status.code() as u8),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
