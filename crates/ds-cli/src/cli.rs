//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ds_search::{ConnectionParameters, Flag};

use crate::config::OutputFormat;

/// dsq - run one LDAP search and print normalized results.
#[derive(Debug, Parser)]
#[command(name = "dsq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ~/.dsq/dsq.toml).
    #[arg(long, global = true, env = "DSQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (overrides config).
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search with parameters given as flags.
    Search(SearchArgs),

    /// Search with parameters read from a JSON document.
    Run(RunArgs),

    /// Configuration management.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Search flags.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search base DN.
    #[arg(short = 'b', long, alias = "dn")]
    pub base_dn: String,

    /// Search scope: base, onelevel, subordinate or children.
    #[arg(short, long, default_value = "base")]
    pub scope: String,

    /// Search filter.
    #[arg(short, long, default_value = "(objectClass=*)")]
    pub filter: String,

    /// Comma-separated attributes to return (all if omitted).
    #[arg(short, long)]
    pub attrs: Option<String>,

    /// Return attribute names only.
    #[arg(long)]
    pub schema: bool,

    /// Comma-separated attributes whose values are always base64-encoded.
    #[arg(long)]
    pub base64_attributes: Option<String>,

    /// Connection options.
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Connection flags.
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Directory server URI (overrides config).
    #[arg(short = 'H', long, env = "DSQ_SERVER_URI")]
    pub server_uri: Option<String>,

    /// Upgrade the connection with StartTLS (`--start-tls=false` overrides config).
    #[arg(
        short = 'Z',
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub start_tls: Option<bool>,

    /// Simple bind DN (SASL EXTERNAL bind if omitted).
    #[arg(short = 'D', long, env = "DSQ_BIND_DN")]
    pub bind_dn: Option<String>,

    /// Simple bind password.
    #[arg(long, env = "DSQ_BIND_PW", hide_env_values = true)]
    pub bind_pw: Option<String>,

    /// Prompt for the bind password.
    #[arg(long, conflicts_with = "bind_pw")]
    pub ask_bind_pw: bool,

    /// Verify the server certificate (`--validate-certs=false` overrides config).
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub validate_certs: Option<bool>,

    /// SASL mechanism without a bind DN: external or none.
    #[arg(long)]
    pub sasl_class: Option<String>,

    /// Timeout in seconds for connecting and searching.
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    /// Converts the flags into connection parameters.
    ///
    /// Switches that are not given stay unset so that configuration defaults
    /// can fill them.
    #[must_use]
    pub fn to_parameters(&self) -> ConnectionParameters {
        ConnectionParameters {
            server_uri: self.server_uri.clone(),
            start_tls: self.start_tls.map(Flag::Bool),
            bind_dn: self.bind_dn.clone(),
            bind_pw: self.bind_pw.clone(),
            validate_certs: self.validate_certs.map(Flag::Bool),
            sasl_class: self.sasl_class.clone(),
            timeout: self.timeout,
        }
    }
}

/// Run flags.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// JSON parameter document, or `-` for stdin.
    #[arg(short, long, default_value = "-")]
    pub params: String,

    /// Connection defaults; values in the document take precedence.
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Config commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value (`none` clears it).
        value: String,
    },
}
