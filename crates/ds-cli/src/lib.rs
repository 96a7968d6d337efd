//! # ds-cli
//!
//! The `dsq` command-line front end for `ds-search`.
//!
//! This crate provides:
//! - One-shot searches from flags (`dsq search`)
//! - Searches from a JSON parameter document (`dsq run`)
//! - Connection defaults in `~/.dsq/dsq.toml` (`dsq config`)

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
