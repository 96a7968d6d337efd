//! Output formatting utilities.

use colored::Colorize;
use ds_search::{AttrValue, SearchOutcome, SearchRecords};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::config::OutputFormat;
use crate::CliError;

/// Prints a success message.
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Structured failure printed in JSON mode.
#[derive(Debug, Serialize)]
pub struct FailureReport {
    /// Always true.
    pub failed: bool,
    /// Error message.
    pub msg: String,
    /// Server or transport diagnostic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl FailureReport {
    /// Builds a report from an error.
    #[must_use]
    pub fn from_error(err: &CliError) -> Self {
        Self {
            failed: true,
            msg: err.to_string(),
            diagnostic: err.diagnostic().map(str::to_string),
        }
    }
}

/// Reports a failure in the given format.
pub fn failure(err: &CliError, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let report = FailureReport::from_error(err);
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(_) => error(&report.msg),
            }
        }
        OutputFormat::Table | OutputFormat::Yaml | OutputFormat::Quiet => {
            error(&err.to_string());
            if let Some(diagnostic) = err.diagnostic().filter(|d| !d.is_empty()) {
                eprintln!("  {}", diagnostic.dimmed());
            }
        }
    }
}

/// Outputs a search outcome in the specified format.
pub fn outcome(outcome: &SearchOutcome, format: OutputFormat) -> crate::CliResult<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(outcome)?;
            println!("{json}");
        }
        OutputFormat::Yaml => print!("{}", render_yaml(outcome)),
        OutputFormat::Table => {
            if outcome.results.is_empty() {
                info("No entries found.");
            } else {
                println!("{}", render_table(&outcome.results));
            }
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

/// Renders an outcome as YAML, keeping attributes in server order.
#[must_use]
pub fn render_yaml(outcome: &SearchOutcome) -> String {
    let mut out = format!(
        "executed: {}\ncount: {}\nresults:",
        outcome.executed, outcome.count
    );
    if outcome.results.is_empty() {
        out.push_str(" []\n");
        return out;
    }
    out.push('\n');

    match &outcome.results {
        SearchRecords::Values(records) => {
            for record in records {
                out.push_str(&format!("  - dn: {}\n", record.dn));
                for (name, value) in &record.attributes {
                    push_yaml_attr(&mut out, name, value);
                }
            }
        }
        SearchRecords::Schema(records) => {
            for record in records {
                out.push_str(&format!("  - dn: {}\n    attrs:\n", record.dn));
                for name in &record.attrs {
                    out.push_str(&format!("      - {name}\n"));
                }
            }
        }
    }
    out
}

fn push_yaml_attr(out: &mut String, name: &str, value: &AttrValue) {
    match value {
        AttrValue::Scalar(v) => out.push_str(&format!("    {name}: {}\n", v.render())),
        AttrValue::List(values) if values.is_empty() => out.push_str(&format!("    {name}: []\n")),
        AttrValue::List(values) => {
            out.push_str(&format!("    {name}:\n"));
            for v in values {
                out.push_str(&format!("      - {}\n", v.render()));
            }
        }
    }
}

/// Renders records as a table with one row per value.
#[must_use]
pub fn render_table(results: &SearchRecords) -> String {
    let mut builder = Builder::default();

    match results {
        SearchRecords::Values(records) => {
            builder.push_record(["DN", "ATTRIBUTE", "VALUE"]);
            for record in records {
                for (name, value) in &record.attributes {
                    for v in value.clone().into_values() {
                        builder.push_record([record.dn.clone(), name.clone(), v.render()]);
                    }
                }
            }
        }
        SearchRecords::Schema(records) => {
            builder.push_record(["DN", "ATTRIBUTE"]);
            for record in records {
                for name in &record.attrs {
                    builder.push_record([record.dn.clone(), name.clone()]);
                }
            }
        }
    }

    builder.build().with(Style::rounded()).to_string()
}

/// Prompts for password input (hidden).
pub fn prompt_password(prompt: &str) -> crate::CliResult<String> {
    rpassword::prompt_password(prompt).map_err(CliError::Io)
}
