//! Run command: search parameters from a JSON document.

use std::io::Read;

use ds_search::{ConnectionParameters, SearchParameters};
use serde::Deserialize;

use crate::cli::RunArgs;
use crate::config::OutputFormat;
use crate::output::prompt_password;
use crate::CliConfig;

/// Parameter document accepted by `dsq run`.
///
/// Search and connection keys share one flat JSON object.
#[derive(Debug, Deserialize)]
pub struct RunDocument {
    /// Search half.
    #[serde(flatten)]
    pub search: SearchParameters,

    /// Connection half.
    #[serde(flatten)]
    pub connection: ConnectionParameters,
}

impl RunDocument {
    /// Parses a document from JSON text.
    pub fn parse(text: &str) -> crate::CliResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Runs a search described by a parameter document.
pub async fn run_params(
    args: RunArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let text = if args.params == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.params)?
    };

    let document = RunDocument::parse(&text)?;

    let mut flags = args.connection.to_parameters();
    if args.connection.ask_bind_pw && document.connection.bind_pw.is_none() {
        flags.bind_pw = Some(prompt_password("Bind password: ")?);
    }

    let connection = document
        .connection
        .merge(flags)
        .merge(config.connection_defaults());

    super::search::perform(&document.search, connection, format).await
}
