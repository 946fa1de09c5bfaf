mod cli;

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, info};

fn main() {
    let cli = cli::Cli::parse();

    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });

    // RUST_LOG directives refine --log-level.
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_env(env_logger::Env::default())
        .init();

    debug!(cli:?; "Parsed arguments");

    let invocation = match cli.invocation() {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{message}");
            process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    if let Err(err) = vcproj_rs::app::run(&invocation, &mut stdout.lock()) {
        eprintln!("{err}");
        process::exit(1);
    }

    info!("Completed successfully");
}
