//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Map devices from a device-management API and append notes to them from a CSV file
#[derive(Parser, Debug)]
#[command(name = "device-notes")]
#[command(version)]
#[command(about = "Map device serials and locations and append notes to devices from a CSV file", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Account / network id used for basic auth (overrides config)
    #[arg(long, global = true)]
    pub account_id: Option<String>,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    /// Skip location mapping when building the device directory
    #[arg(long, global = true)]
    pub no_locations: bool,

    /// Don't write the directory snapshot files
    #[arg(long, global = true)]
    pub no_snapshots: bool,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Append notes to every device listed in a CSV file (default command)
    UpdateNotes {
        /// CSV file with serial numbers and notes (overrides config)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Build the device directory, write snapshots and print a summary
    Map,

    /// Resolve a serial number to its device identifier
    Lookup {
        /// Serial number to resolve
        #[arg(short, long)]
        serial: String,
    },

    /// Fetch and print one device record
    ShowDevice {
        /// Device identifier (UDID)
        #[arg(short, long)]
        udid: String,

        /// Include installed apps in the record
        #[arg(long)]
        include_apps: bool,
    },

    /// Overwrite the notes of one device (previous notes are lost)
    ReplaceNotes {
        /// Device identifier (UDID)
        #[arg(short, long)]
        udid: String,

        /// New notes text
        #[arg(short, long)]
        notes: String,
    },

    /// Show the configuration file location
    ///
    /// If no config file exists, a default one is created in the standard
    /// location.
    Config {
        /// Only print the path, don't create anything
        #[arg(long)]
        path: bool,

        /// Reset the config file to defaults
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration (token masked)
    ShowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_none() {
        let args = Args::parse_from(["device-notes"]);
        assert!(args.command.is_none());
        assert!(!args.no_locations);
    }

    #[test]
    fn test_update_notes_with_overrides() {
        let args = Args::parse_from([
            "device-notes",
            "update-notes",
            "--csv",
            "list.csv",
            "--timeout",
            "30",
            "--no-locations",
        ]);
        match args.command {
            Some(Commands::UpdateNotes { csv }) => assert_eq!(csv, Some(PathBuf::from("list.csv"))),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(args.timeout, Some(30.0));
        assert!(args.no_locations);
    }

    #[test]
    fn test_replace_notes_requires_both_fields() {
        assert!(Args::try_parse_from(["device-notes", "replace-notes", "--udid", "X"]).is_err());
        let args =
            Args::parse_from(["device-notes", "replace-notes", "-u", "X", "-n", "hello"]);
        assert!(matches!(
            args.command,
            Some(Commands::ReplaceNotes { ref udid, ref notes }) if udid == "X" && notes == "hello"
        ));
    }
}
