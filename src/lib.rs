//! Device Notes Tool Library
//!
//! A client for a device-management REST API that builds a serial-number
//! directory of the fleet (optionally grouped by location) and appends notes
//! to devices without losing what is already there.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration, error types, the device directory, the notes
//!   append workflow, CSV records and the batch runner
//! - [`device`] - The API client and the transport it talks through
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - An in-memory mock API with fault injection for testing
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use device_notes_tool::core::config::Config;
//! use device_notes_tool::core::records::load_csv;
//! use device_notes_tool::core::batch::NotesBatch;
//! use device_notes_tool::core::session::NotesSession;
//! use device_notes_tool::device::HttpTransport;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     config.api.validate()?;
//!
//!     // Build the directory (and write the snapshot files)
//!     let transport = HttpTransport::new(&config.api)?;
//!     let session = NotesSession::connect(transport, &config.directory_options())?;
//!
//!     // Append notes for every row of the CSV file
//!     let records = load_csv(&config.input.csv_file)?;
//!     let report = NotesBatch::new().run(&session, &records);
//!     println!("{}", report);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod device;
pub mod testdb;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
