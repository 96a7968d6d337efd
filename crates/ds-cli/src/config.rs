//! CLI configuration.
//!
//! Connection defaults live in `~/.dsq/dsq.toml`. Command-line flags,
//! environment variables and parameter documents override them. The bind
//! password is never stored in the file.

use std::path::{Path, PathBuf};

use ds_search::{ConnectionParameters, Flag};
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default directory endpoint.
    pub server_uri: Option<String>,

    /// Use StartTLS by default.
    pub start_tls: Option<bool>,

    /// Default bind DN.
    pub bind_dn: Option<String>,

    /// Verify server certificates by default.
    pub validate_certs: Option<bool>,

    /// SASL mechanism when no bind DN is set (`external` or `none`).
    pub sasl_class: Option<String>,

    /// Timeout in seconds.
    pub timeout: Option<u64>,

    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl CliConfig {
    /// Loads configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> crate::CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content).map_err(|e| {
                crate::CliError::Config(format!("failed to parse config: {e}"))
            })?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to `path`.
    pub fn save_to(&self, path: &Path) -> crate::CliResult<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::CliError::Config(format!("failed to serialize config: {e}"))
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Gets the default configuration file path.
    pub fn config_path() -> crate::CliResult<PathBuf> {
        let home = dirs_next::home_dir().ok_or_else(|| {
            crate::CliError::Config("could not determine home directory".to_string())
        })?;
        Ok(home.join(".dsq").join("dsq.toml"))
    }

    /// Returns the connection defaults as declarative parameters.
    #[must_use]
    pub fn connection_defaults(&self) -> ConnectionParameters {
        ConnectionParameters {
            server_uri: self.server_uri.clone(),
            start_tls: self.start_tls.map(Flag::Bool),
            bind_dn: self.bind_dn.clone(),
            bind_pw: None,
            validate_certs: self.validate_certs.map(Flag::Bool),
            sasl_class: self.sasl_class.clone(),
            timeout: self.timeout,
        }
    }

    /// Sets a configuration value by key.
    pub fn set(&mut self, key: &str, value: &str) -> crate::CliResult<()> {
        let cleared = value.is_empty() || value == "none";
        match key {
            "server_uri" | "server" => {
                self.server_uri = (!cleared).then(|| value.to_string());
            }
            "bind_dn" => {
                self.bind_dn = (!cleared).then(|| value.to_string());
            }
            "start_tls" => {
                self.start_tls = parse_optional_bool(key, value, cleared)?;
            }
            "validate_certs" => {
                self.validate_certs = parse_optional_bool(key, value, cleared)?;
            }
            "sasl_class" => {
                self.sasl_class = (!cleared).then(|| value.to_string());
            }
            "timeout" => {
                self.timeout = if cleared {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        crate::CliError::InvalidArgument(format!(
                            "timeout must be a number of seconds, got '{value}'"
                        ))
                    })?)
                };
            }
            "output_format" | "output" => {
                self.output_format = match value.to_lowercase().as_str() {
                    "table" => OutputFormat::Table,
                    "json" => OutputFormat::Json,
                    "yaml" => OutputFormat::Yaml,
                    "quiet" => OutputFormat::Quiet,
                    _ => {
                        return Err(crate::CliError::InvalidArgument(format!(
                            "Unknown output format: {value}. Supported: table, json, yaml, quiet"
                        )));
                    }
                };
            }
            "bind_pw" => {
                return Err(crate::CliError::InvalidArgument(
                    "bind_pw is not stored in the configuration file; use DSQ_BIND_PW or --ask-bind-pw"
                        .to_string(),
                ));
            }
            _ => {
                return Err(crate::CliError::InvalidArgument(format!(
                    "Unknown configuration key: {key}. Known keys: server_uri, bind_dn, start_tls, validate_certs, sasl_class, timeout, output_format"
                )));
            }
        }
        Ok(())
    }
}

fn parse_optional_bool(key: &str, value: &str, cleared: bool) -> crate::CliResult<Option<bool>> {
    if cleared {
        return Ok(None);
    }
    Flag::Text(value.to_string())
        .coerce(key)
        .map(Some)
        .map_err(crate::CliError::from)
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON document.
    #[default]
    Json,
    /// YAML-like listing.
    Yaml,
    /// Human-readable table, one row per value.
    Table,
    /// No output; only the exit status.
    Quiet,
}
