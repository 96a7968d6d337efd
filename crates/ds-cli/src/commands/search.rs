//! Search command.

use ds_search::{AttrsInput, ConnectionParameters, ConnectionProvider, Flag, SearchParameters};
use tracing::debug;

use crate::cli::SearchArgs;
use crate::config::OutputFormat;
use crate::output::{self, prompt_password};
use crate::CliConfig;

/// Runs a search described by command-line flags.
pub async fn run_search(
    args: SearchArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let params = SearchParameters {
        base_dn: args.base_dn,
        scope: args.scope,
        filter: args.filter,
        attrs: args.attrs.map(AttrsInput::Csv),
        schema: Flag::Bool(args.schema),
        base64_attributes: args.base64_attributes.map(AttrsInput::Csv),
    };

    let mut connection = args.connection.to_parameters();
    if args.connection.ask_bind_pw {
        connection.bind_pw = Some(prompt_password("Bind password: ")?);
    }

    perform(&params, connection.merge(config.connection_defaults()), format).await
}

/// Connects, runs one search, unbinds and prints the outcome.
pub(crate) async fn perform(
    params: &SearchParameters,
    connection: ConnectionParameters,
    format: OutputFormat,
) -> crate::CliResult<()> {
    debug!(?connection, "Resolving connection parameters");

    let mut provider = ConnectionProvider::new(connection.resolve()?)?;
    let result = ds_search::execute(params, &mut provider).await;
    provider.close().await;

    let outcome = result?;
    output::outcome(&outcome, format)
}
