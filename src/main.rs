//! wrapconf
//!
//! Resolves a workflow configuration and prints the per-step views that
//! wrapper components consume.

use anyhow::Result;
use clap::Parser;
use serde_json::{Value, json};
use std::fs::OpenOptions;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;
use wrapconf::cli::{Cli, Command};
use wrapconf::config::ConfReader;
use wrapconf::logging::Logger;
use wrapconf::schema::PropertySchema;

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Run the schema check over every entry and collect the warnings per step.
fn check_report(reader: &ConfReader, prefix: Option<&str>) -> Value {
    let schema = PropertySchema::common();
    let props = reader.get_prop_dic(prefix, None);
    let mut report = serde_json::Map::new();
    for (step, entry) in props.iter() {
        let issues: Vec<String> = schema
            .check_properties(entry, &[])
            .iter()
            .map(ToString::to_string)
            .collect();
        let mistyped: Vec<&str> = schema.mistyped(&entry.settings);
        for key in &mistyped {
            warn!(step = step.unwrap_or("-"), key = %key, "Property has an unexpected type");
        }
        report.insert(
            step.unwrap_or("").to_string(),
            json!({ "unrecognized": issues, "mistyped": mistyped }),
        );
    }
    Value::Object(report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let reader = ConfReader::new(&cli.config, cli.system.as_deref())?;
    let prefix = cli.prefix.as_deref();
    let global_log = Logger::new().with_name("wrapconf");

    let output = match cli.command.unwrap_or(Command::Props) {
        Command::Props => serde_json::to_value(reader.get_prop_dic(prefix, Some(&global_log)))?,
        Command::Paths => serde_json::to_value(reader.get_paths_dic(prefix)?)?,
        Command::Workdir => {
            println!("{}", reader.get_working_dir_path().display());
            return Ok(());
        }
        Command::Check => check_report(&reader, prefix),
    };

    info!(source = %reader.source(), "Resolved configuration");
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
