//! CLI command definitions for wrapconf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand};

/// Resolve workflow configurations into per-step properties and paths
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file ([YAML|JSON]) or inline JSON string
    pub config: String,

    /// System name whose settings every step inherits
    #[arg(short, long, global = true)]
    pub system: Option<String>,

    /// Prefix inserted into every generated path
    #[arg(short, long, global = true)]
    pub prefix: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print resolved properties as JSON (default if no subcommand given)
    Props,

    /// Print resolved paths as JSON
    Paths,

    /// Print the working directory
    Workdir,

    /// Check every step's properties against the common property schema
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["wrapconf", "conf.yml"]);
        assert_eq!(cli.config, "conf.yml");
        assert_eq!(cli.log, "2");
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_subcommand_with_globals() {
        let cli = Cli::parse_from(["wrapconf", "conf.yml", "paths", "--system", "linux", "-p", "run1"]);
        assert_eq!(cli.command, Some(Command::Paths));
        assert_eq!(cli.system.as_deref(), Some("linux"));
        assert_eq!(cli.prefix.as_deref(), Some("run1"));
    }
}
