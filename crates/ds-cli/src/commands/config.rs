//! Configuration management commands.

use std::path::Path;

use crate::cli::ConfigCommand;
use crate::output::{info, success};
use crate::CliConfig;

/// Runs a config command.
pub fn run_config(
    cmd: ConfigCommand,
    config: &mut CliConfig,
    path: &Path,
) -> crate::CliResult<()> {
    match cmd {
        ConfigCommand::Show => {
            show_config(config, path);
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            config.set(&key, &value)?;
            config.save_to(path)?;
            success(&format!("Set {key} = {value}"));
            Ok(())
        }
    }
}

fn show_config(config: &CliConfig, path: &Path) {
    info(&format!("Configuration file: {}", path.display()));
    println!();
    println!("{}", render(config));
}

/// Renders configuration as `key: value` lines; unset keys show `(default)`.
#[must_use]
pub fn render(config: &CliConfig) -> String {
    fn line(key: &str, value: Option<String>) -> String {
        format!("{key}: {}", value.unwrap_or_else(|| "(default)".to_string()))
    }

    [
        line("server_uri", config.server_uri.clone()),
        line("start_tls", config.start_tls.map(|v| v.to_string())),
        line("bind_dn", config.bind_dn.clone()),
        line("validate_certs", config.validate_certs.map(|v| v.to_string())),
        line("sasl_class", config.sasl_class.clone()),
        line("timeout", config.timeout.map(|v| format!("{v}s"))),
        format!("output_format: {:?}", config.output_format).to_lowercase(),
    ]
    .join("\n")
}
