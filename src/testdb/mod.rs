//! Test Database Module
//!
//! Testing support for the device notes tool that doesn't need a live API.
//!
//! # Features
//!
//! - **Mock API**: an in-memory implementation of the device-management
//!   endpoints behind the same `Transport` trait the HTTP client uses
//! - **Request recording**: every request is kept so tests can assert what was
//!   (or was not) sent
//! - **Fault injection**: timeouts, refused connections and arbitrary
//!   status/body responses for chosen endpoints
//! - **Fixtures**: a small sample fleet with locations
//!
//! # Quick Start
//!
//! ```rust
//! use device_notes_tool::core::directory::DirectoryOptions;
//! use device_notes_tool::core::session::NotesSession;
//! use device_notes_tool::testdb::sample_fleet;
//!
//! let api = sample_fleet();
//! let session = NotesSession::connect(&api, &DirectoryOptions::serials_only()).unwrap();
//! let outcome = session.update_notes_for_serial("F9FXK0Q1HLF9", "Battery replaced");
//! assert!(outcome.is_ok());
//! ```

pub mod mock_api;

#[cfg(test)]
mod integration;

pub use mock_api::{Fault, FaultKind, MockApi, MockDevice};

/// A fleet of five devices in two locations
///
/// | UDID      | Serial       | Location        | Notes            |
/// |-----------|--------------|-----------------|------------------|
/// | udid-0001 | F9FXK0Q1HLF9 | 1 (Main Campus) | "Asset tag 1001" |
/// | udid-0002 | DMPXQ2ZJKD6L | 1 (Main Campus) | null             |
/// | udid-0003 | C02ZK1ABMD6R | 2 (North Annex) | ""               |
/// | udid-0004 | GG7DL4C3Q1GC | 2 (North Annex) | "Cart B"         |
/// | udid-0005 | H4TXR9PLQ0N2 | none            | ""               |
pub fn sample_fleet() -> MockApi {
    MockApi::new()
        .with_location("1", "Main Campus")
        .with_location("2", "North Annex")
        .with_device(
            MockDevice::new("udid-0001", "F9FXK0Q1HLF9", "Library iPad 01")
                .in_location("1")
                .with_notes("Asset tag 1001"),
        )
        .with_device(
            MockDevice::new("udid-0002", "DMPXQ2ZJKD6L", "Library iPad 02")
                .in_location("1")
                .with_null_notes(),
        )
        .with_device(
            MockDevice::new("udid-0003", "C02ZK1ABMD6R", "Front Office iMac")
                .with_class("mac")
                .in_location("2"),
        )
        .with_device(
            MockDevice::new("udid-0004", "GG7DL4C3Q1GC", "Cart B iPad 14")
                .in_location("2")
                .with_notes("Cart B"),
        )
        .with_device(
            MockDevice::new("udid-0005", "H4TXR9PLQ0N2", "Spare iPhone").with_class("iphone"),
        )
}
