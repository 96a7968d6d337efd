//! # dsq
//!
//! Runs one LDAP search and prints normalized results.

#![forbid(unsafe_code)]

use clap::Parser;
use ds_cli::{
    cli::{Cli, Command},
    commands::{run_config, run_params, run_search},
    config::CliConfig,
    output, CliError,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = match cli.config.clone().map_or_else(CliConfig::config_path, Ok) {
        Ok(path) => path,
        Err(e) => {
            output::error(&format!("Failed to locate configuration: {e}"));
            std::process::exit(1);
        }
    };

    let mut config = match CliConfig::load_from(&config_path) {
        Ok(c) => c,
        Err(e) => {
            output::error(&format!("Failed to load configuration: {e}"));
            std::process::exit(1);
        }
    };

    let format = cli.output.unwrap_or(config.output_format);

    let result: Result<(), CliError> = match cli.command {
        Command::Search(args) => run_search(args, &config, format).await,
        Command::Run(args) => run_params(args, &config, format).await,
        Command::Config(cmd) => run_config(cmd, &mut config, &config_path),
    };

    if let Err(e) = result {
        output::failure(&e, format);
        std::process::exit(1);
    }
}
