mod engine;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use btmeta::config::Config;
use btmeta::download::UnavailableDownloader;

use crate::engine::{use_command, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let res = use_command(cli.command, &config, &UnavailableDownloader, &mut io::stdout().lock());
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
