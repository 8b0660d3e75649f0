//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    directory_spinner, format_duration, print_error, print_field, print_header, print_info,
    print_success, print_warning, BatchProgressBar,
};
use crate::cli::{Args, Commands};
use crate::core::batch::{BatchReport, NotesBatch};
use crate::core::config::{get_config_path, init_config, Config};
use crate::core::directory::{DeviceDirectory, DirectoryOptions};
use crate::core::outcome::Failure;
use crate::core::records::{load_csv, NoteRecord};
use crate::core::session::NotesSession;
use crate::device::client::ApiClient;
use crate::device::http::HttpTransport;
use crate::device::traits::Transport;
use anyhow::{Context, Result};
use log::{error, info, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// How a command finished, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Everything the command attempted succeeded
    Success,
    /// The command ran, but at least one device operation failed
    Failed,
}

impl CommandStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::Failed => 1,
        }
    }

    fn from_ok(ok: bool) -> Self {
        if ok {
            CommandStatus::Success
        } else {
            CommandStatus::Failed
        }
    }
}

/// Apply global command-line overrides on top of the loaded configuration
pub fn apply_overrides(args: &Args, config: &mut Config) {
    if let Some(ref base_url) = args.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(ref account_id) = args.account_id {
        config.api.account_id = account_id.clone();
    }
    if let Some(timeout) = args.timeout {
        config.api.timeout_secs = timeout;
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.no_locations {
        config.directory.map_locations = false;
    }
    if args.no_snapshots {
        config.directory.write_snapshots = false;
    }
    if let Some(Commands::UpdateNotes { csv: Some(ref csv) }) = args.command {
        config.input.csv_file = csv.clone();
    }
}

/// Run the appropriate command based on CLI arguments
///
/// `update-notes` runs when no subcommand is given. Errors that stop a
/// command outright (bad configuration, unreadable CSV, a failed directory
/// build) are returned; per-device failures are reported and turn into
/// `CommandStatus::Failed`.
pub fn run_command(
    args: &Args,
    config: &Config,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<CommandStatus> {
    match &args.command {
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
            Ok(CommandStatus::Success)
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
            Ok(CommandStatus::Success)
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
            Ok(CommandStatus::Success)
        }
        Some(Commands::Map) => map_directory(config),
        Some(Commands::Lookup { serial }) => lookup(config, serial),
        Some(Commands::ShowDevice { udid, include_apps }) => {
            show_device(config, udid, *include_apps)
        }
        Some(Commands::ReplaceNotes { udid, notes }) => replace_notes(config, udid, notes),
        Some(Commands::UpdateNotes { .. }) | None => update_notes(config, shutdown_flag),
    }
}

// ============================================================================
// API commands
// ============================================================================

/// Validate the API settings and open an HTTP transport
fn open_transport(config: &Config) -> Result<HttpTransport> {
    config.api.validate()?;
    let transport = HttpTransport::new(&config.api)?;
    info!(
        "Using API at {} (account {})",
        transport.base_url(),
        config.api.account_id
    );
    Ok(transport)
}

/// Build the device directory behind a spinner
fn connect(config: &Config, options: &DirectoryOptions) -> Result<NotesSession<HttpTransport>> {
    let transport = open_transport(config)?;

    let spinner = directory_spinner("Building device directory...");
    let session = NotesSession::connect(transport, options);
    spinner.finish_and_clear();

    let session = session.context("Failed to build the device directory")?;
    info!(
        "Directory ready: {} device(s), {} location(s)",
        session.directory().device_count(),
        session.directory().location_count()
    );
    Ok(session)
}

/// Append notes from the configured CSV file to every listed device
fn update_notes(config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<CommandStatus> {
    let csv_path = &config.input.csv_file;
    let records = load_csv(csv_path)
        .with_context(|| format!("Failed to load records from {}", csv_path.display()))?;
    info!("Loaded {} record(s) from {}", records.len(), csv_path.display());

    if records.is_empty() {
        warn!("No records in {}; nothing to update", csv_path.display());
        return Ok(CommandStatus::Success);
    }

    info!("==== Notes update started ====");
    let session = connect(config, &config.directory_options())?;
    let report = run_batch(&session, &records, shutdown_flag);
    info!("==== Notes update ended ====");
    print_batch_summary(&report, csv_path);

    Ok(CommandStatus::from_ok(report.all_succeeded()))
}

/// Run the batch with a progress bar attached
fn run_batch<T: Transport>(
    session: &NotesSession<T>,
    records: &[NoteRecord],
    shutdown_flag: Arc<AtomicBool>,
) -> BatchReport {
    let progress = BatchProgressBar::new(records.len());
    let bar = progress.handle();

    let batch = NotesBatch::new()
        .with_shutdown_flag(shutdown_flag)
        .with_progress(move |update| {
            BatchProgressBar::update(&bar, update.current_index, &update.serial_number)
        });

    let report = batch.run(session, records);

    if report.interrupted {
        progress.abandon("interrupted");
    } else {
        progress.finish("done");
    }
    report
}

fn print_batch_summary(report: &BatchReport, source: &Path) {
    print_header("Notes Update Summary");
    print_field("Input", &source.display().to_string());
    print_field("Records", &report.total.to_string());
    print_field("Updated", &report.succeeded.to_string());
    print_field("Failed", &report.failed().to_string());
    print_field("Skipped", &report.skipped.to_string());
    print_field(
        "Duration",
        &format_duration(Duration::from_millis(report.duration_ms)),
    );
    println!();

    for failed in &report.failures {
        print_error(&format!(
            "line {} ({}): {}",
            failed.line,
            failed.serial_number.as_deref().unwrap_or("no serial"),
            failed.failure
        ));
    }

    if report.interrupted {
        print_warning(&format!(
            "Interrupted after {} of {} record(s)",
            report.processed(),
            report.total
        ));
    } else if report.all_succeeded() {
        print_success("All devices updated");
    }
}

/// Build the directory, write snapshots and print a summary
fn map_directory(config: &Config) -> Result<CommandStatus> {
    let options = config.directory_options();
    let session = connect(config, &options)?;
    print_directory_summary(session.directory(), &options);
    Ok(CommandStatus::Success)
}

fn print_directory_summary(directory: &DeviceDirectory, options: &DirectoryOptions) {
    print_header("Device Directory");
    print_field("Devices", &directory.device_count().to_string());

    match directory.locations() {
        Some(locations) => {
            print_field("Locations", &locations.names().len().to_string());
            println!();
            for (name, devices) in locations.devices() {
                print_info(&format!("{}: {} device(s)", name, devices.len()));
            }
        }
        None => print_field("Locations", "not mapped"),
    }

    println!();
    match options.snapshot_dir {
        Some(ref dir) => print_success(&format!("Snapshots written to {}", dir.display())),
        None => print_info("Snapshots disabled"),
    }
}

/// Resolve one serial number through a serials-only directory
fn lookup(config: &Config, serial: &str) -> Result<CommandStatus> {
    let options = config.directory_options().map_locations(false);
    let session = connect(config, &options)?;
    Ok(print_lookup(&session, serial))
}

fn print_lookup<T: Transport>(session: &NotesSession<T>, serial: &str) -> CommandStatus {
    match session.resolve_serial(serial) {
        Ok(udid) => {
            println!("{}", udid);
            CommandStatus::Success
        }
        Err(failure) => {
            error!("{}", failure);
            CommandStatus::Failed
        }
    }
}

/// Fetch one device record and print it as JSON
fn show_device(config: &Config, udid: &str, include_apps: bool) -> Result<CommandStatus> {
    let client = ApiClient::new(open_transport(config)?);
    let outcome = client.get_device(udid, include_apps);
    if let Some(record) = outcome.value() {
        info!(
            "Fetched {} ({})",
            udid,
            record.name().unwrap_or("unnamed device")
        );
    }
    print_envelope(outcome.failure(), &outcome.lookup_envelope())
}

/// Overwrite the notes of one device and print the result envelope
fn replace_notes(config: &Config, udid: &str, notes: &str) -> Result<CommandStatus> {
    let client = ApiClient::new(open_transport(config)?);
    warn!("Replacing notes for {}; existing notes will be lost", udid);
    let outcome = client.replace_device_notes(udid, notes);
    print_envelope(outcome.failure(), &serde_json::to_value(&outcome)?)
}

fn print_envelope(failure: Option<&Failure>, envelope: &Value) -> Result<CommandStatus> {
    if let Some(failure) = failure {
        error!("{}", failure);
    }
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(CommandStatus::from_ok(failure.is_none()))
}

// ============================================================================
// Configuration commands
// ============================================================================

/// Handle the config command
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                std::fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    let active = Config::get_active_config_path();
    let path = if active.exists() {
        active
    } else {
        init_config()?
    };
    println!("{}", path.display());
    info!("Edit this file to set the API base URL, account id and token.");
    info!("Run 'device-notes show-config' to verify your settings.");
    Ok(())
}

/// Generate a configuration file
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            std::fs::write(&path, Config::generate_default_config())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Fill in the [api] section before running 'device-notes update-notes'.");
    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[api]");
    info!("  base_url = {:?}", config.api.base_url);
    info!("  account_id = {:?}", config.api.account_id);
    info!("  api_token = {}", config.api.masked_token());
    info!("  timeout_secs = {}", config.api.timeout_secs);
    if let Err(e) = config.api.validate() {
        info!("  ⚠ {}", e);
    }
    info!("");
    info!("[directory]");
    info!("  map_locations = {}", config.directory.map_locations);
    info!("  write_snapshots = {}", config.directory.write_snapshots);
    info!(
        "  snapshot_dir = \"{}\"",
        config.directory.snapshot_dir.display()
    );
    info!("");
    info!("[input]");
    info!("  csv_file = \"{}\"", config.input.csv_file.display());
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notes::NOTES_SEPARATOR;
    use crate::core::records::read_records;
    use crate::testdb::sample_fleet;
    use clap::Parser;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_apply_overrides() {
        let args = Args::parse_from([
            "device-notes",
            "--base-url",
            "https://mdm.example.com/api",
            "--account-id",
            "12345",
            "--timeout",
            "2.5",
            "--no-snapshots",
            "update-notes",
            "--csv",
            "today.csv",
        ]);
        let mut config = Config::default();
        apply_overrides(&args, &mut config);

        assert_eq!(config.api.base_url, "https://mdm.example.com/api");
        assert_eq!(config.api.account_id, "12345");
        assert_eq!(config.api.timeout_secs, 2.5);
        assert!(!config.directory.write_snapshots);
        assert!(config.directory.map_locations);
        assert_eq!(config.input.csv_file, PathBuf::from("today.csv"));
        assert!(config.directory_options().snapshot_dir.is_none());
    }

    #[test]
    fn test_api_commands_fail_without_credentials() {
        let args = Args::parse_from(["device-notes", "show-device", "-u", "udid-0001"]);
        let result = run_command(&args, &Config::default(), Arc::new(AtomicBool::new(false)));
        assert!(result.is_err());
    }

    #[test]
    fn test_run_batch_updates_devices() {
        let api = sample_fleet();
        let session = NotesSession::connect(&api, &DirectoryOptions::serials_only()).unwrap();
        let records = read_records(
            "SerialNumber,Notes\nGG7DL4C3Q1GC,Checked\nUNKNOWN,Lost\n".as_bytes(),
            "inline",
        )
        .unwrap();

        let report = run_batch(&session, &records, Arc::new(AtomicBool::new(false)));

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            api.notes_of("udid-0004").unwrap(),
            format!("Cart B{}Checked", NOTES_SEPARATOR)
        );
    }

    #[test]
    fn test_run_batch_honors_shutdown_flag() {
        let api = sample_fleet();
        let session = NotesSession::connect(&api, &DirectoryOptions::serials_only()).unwrap();
        let records =
            read_records("SerialNumber,Notes\nGG7DL4C3Q1GC,Checked\n".as_bytes(), "inline")
                .unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::SeqCst);

        let report = run_batch(&session, &records, flag);

        assert!(report.interrupted);
        assert_eq!(report.processed(), 0);
        assert_eq!(api.notes_of("udid-0004").as_deref(), Some("Cart B"));
    }

    #[test]
    fn test_print_lookup_status() {
        let api = sample_fleet();
        let session = NotesSession::connect(&api, &DirectoryOptions::serials_only()).unwrap();
        assert_eq!(print_lookup(&session, " F9FXK0Q1HLF9 "), CommandStatus::Success);
        assert_eq!(print_lookup(&session, "missing"), CommandStatus::Failed);
    }

    #[test]
    fn test_print_envelope_status() {
        let api = sample_fleet();
        let client = ApiClient::new(&api);

        let found = client.get_device("udid-0003", false);
        assert_eq!(found.lookup_envelope()["device"]["UDID"], "udid-0003");
        assert_eq!(
            print_envelope(found.failure(), &found.lookup_envelope()).unwrap(),
            CommandStatus::Success
        );

        let missing = client.get_device("nope", false);
        assert_eq!(
            print_envelope(missing.failure(), &missing.lookup_envelope()).unwrap(),
            CommandStatus::Failed
        );
    }

    #[test]
    fn test_oversized_timeout_is_rejected_before_connecting() {
        let args = Args::parse_from(["device-notes", "--timeout", "1e20", "map"]);
        let mut config = Config::default();
        config.api.base_url = "https://mdm.example.com/api".to_string();
        config.api.account_id = "12345".to_string();
        config.api.api_token = "token".to_string();
        apply_overrides(&args, &mut config);

        let result = run_command(&args, &config, Arc::new(AtomicBool::new(false)));
        assert!(result.is_err());
    }

    #[test]
    fn test_command_status_exit_codes() {
        assert_eq!(CommandStatus::Success.exit_code(), 0);
        assert_eq!(CommandStatus::Failed.exit_code(), 1);
    }
}
