//! API client bundled with its device directory
//!
//! A `NotesSession` is what the CLI works with: it owns the client and the
//! directory built when it was connected, and resolves serial numbers before
//! updating notes. The directory is never refreshed; a long run works against
//! the state the API had at startup.

use crate::core::directory::{DeviceDirectory, DirectoryOptions};
use crate::core::error::Result;
use crate::core::outcome::{Failure, Outcome};
use crate::device::client::ApiClient;
use crate::device::traits::Transport;
use log::debug;

/// Client plus the directory built at construction
pub struct NotesSession<T: Transport> {
    client: ApiClient<T>,
    directory: DeviceDirectory,
}

impl<T: Transport> NotesSession<T> {
    /// Build the directory over `transport`; fails if any directory call fails
    pub fn connect(transport: T, options: &DirectoryOptions) -> Result<Self> {
        let client = ApiClient::new(transport);
        let directory = DeviceDirectory::build(&client, options)?;
        Ok(Self { client, directory })
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    /// Look up the identifier for a serial number
    pub fn resolve_serial(&self, serial: &str) -> std::result::Result<&str, Failure> {
        if serial.trim().is_empty() {
            return Err(Failure::missing_serial());
        }
        self.directory
            .udid_for_serial(serial)
            .ok_or_else(|| Failure::unresolved_serial(serial.trim()))
    }

    /// Append notes to the device with the given identifier
    pub fn update_notes(&self, udid: &str, notes: &str) -> Outcome {
        self.client.update_device_notes(udid, notes)
    }

    /// Append notes to the device with the given serial number
    ///
    /// An unknown serial is reported as an unresolved-serial failure and no
    /// request is sent.
    pub fn update_notes_for_serial(&self, serial: &str, notes: &str) -> Outcome {
        match self.resolve_serial(serial) {
            Ok(udid) => {
                debug!("Serial {} resolved to {}", serial, udid);
                self.client.update_device_notes(udid, notes)
            }
            Err(failure) => failure.into(),
        }
    }

    /// Overwrite the notes of the device with the given identifier
    pub fn replace_notes(&self, udid: &str, notes: &str) -> Outcome {
        self.client.replace_device_notes(udid, notes)
    }
}
