//! Core functionality module
//!
//! This module contains the business logic of the device notes tool:
//! configuration, error handling, the device directory, the notes updater and
//! the CSV batch.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and validation
//! - `error` - Error types and result aliases
//! - `outcome` - Structured per-device results
//! - `directory` - Serial, identifier and location mappings
//! - `snapshot` - JSON snapshot files of the directory
//! - `notes` - Appending and replacing device notes
//! - `session` - Client plus directory, serial resolution
//! - `records` - CSV input loading
//! - `batch` - Sequential notes batch over CSV records

pub mod batch;
pub mod config;
pub mod directory;
pub mod error;
pub mod notes;
pub mod outcome;
pub mod records;
pub mod session;
pub mod snapshot;
