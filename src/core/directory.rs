//! Device directory: serial, identifier and location mappings
//!
//! The directory is built once at startup from the list endpoints:
//!
//! 1. `GET devices` -> serial number -> identifier
//! 2. `GET locations/` -> location id -> location name
//! 3. `GET devices?location=<id>` for every location -> location name ->
//!    identifier -> summary
//!
//! Steps 2 and 3 only run when location mapping is enabled. Any failed call
//! aborts the build. Each mapping is assembled in a local value and the
//! [`DeviceDirectory`] is only created once all of them are complete, so a
//! half-built directory can never be observed.

use crate::core::error::Result;
use crate::core::snapshot::{
    SnapshotWriter, LOCATION_DEVICES_SNAPSHOT_FILE, LOCATION_SNAPSHOT_FILE, SERIAL_SNAPSHOT_FILE,
};
use crate::device::client::ApiClient;
use crate::device::models::{DeviceSummary, Location};
use crate::device::traits::Transport;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Serial number -> device identifier
pub type SerialIndex = BTreeMap<String, String>;

/// Location id -> location name
pub type LocationNames = BTreeMap<String, String>;

/// Location name -> device identifier -> summary
pub type LocationDevices = BTreeMap<String, BTreeMap<String, DeviceEntry>>;

/// Summary stored per device in the location mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub name: Option<String>,
    #[serde(rename = "serialNumber")]
    pub serial_number: Option<String>,
    pub class: Option<String>,
}

impl From<&DeviceSummary> for DeviceEntry {
    fn from(device: &DeviceSummary) -> Self {
        Self {
            name: device.name.clone(),
            serial_number: device.serial_number.clone(),
            class: device.class.clone(),
        }
    }
}

/// Options for building the directory
#[derive(Debug, Clone)]
pub struct DirectoryOptions {
    /// Also fetch locations and the per-location device lists
    pub map_locations: bool,
    /// Where to write the snapshot files (`None` = don't write)
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            map_locations: true,
            snapshot_dir: Some(PathBuf::from(".")),
        }
    }
}

impl DirectoryOptions {
    /// Serial mapping only, nothing written to disk
    pub fn serials_only() -> Self {
        Self {
            map_locations: false,
            snapshot_dir: None,
        }
    }

    pub fn map_locations(mut self, value: bool) -> Self {
        self.map_locations = value;
        self
    }

    pub fn snapshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.snapshot_dir = dir;
        self
    }
}

/// Location mappings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationIndex {
    names: LocationNames,
    devices: LocationDevices,
}

impl LocationIndex {
    pub fn new(names: LocationNames, devices: LocationDevices) -> Self {
        Self { names, devices }
    }

    pub fn names(&self) -> &LocationNames {
        &self.names
    }

    pub fn devices(&self) -> &LocationDevices {
        &self.devices
    }

    pub fn name_of(&self, location_id: &str) -> Option<&str> {
        self.names.get(location_id).map(String::as_str)
    }

    pub fn devices_in(&self, location_name: &str) -> Option<&BTreeMap<String, DeviceEntry>> {
        self.devices.get(location_name)
    }
}

/// In-memory mappings built once per process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDirectory {
    serials: SerialIndex,
    locations: Option<LocationIndex>,
}

impl DeviceDirectory {
    /// Assemble a directory from already-built mappings
    pub fn new(serials: SerialIndex, locations: Option<LocationIndex>) -> Self {
        Self { serials, locations }
    }

    /// Fetch everything from the API and build the directory
    pub fn build<T: Transport>(client: &ApiClient<T>, options: &DirectoryOptions) -> Result<Self> {
        let snapshots = options.snapshot_dir.as_ref().map(SnapshotWriter::new);

        info!("Mapping device serial numbers to UDIDs...");
        let devices = client.get_devices()?;
        let serials = index_serials(&devices);
        info!("    {} device(s) mapped", serials.len());
        if let Some(ref writer) = snapshots {
            write_snapshot(writer, SERIAL_SNAPSHOT_FILE, &serials);
        }

        let locations = if options.map_locations {
            info!("Mapping locations...");
            let locations = client.get_locations()?;
            let names = index_locations(&locations);
            info!("    {} location(s) mapped", names.len());
            if let Some(ref writer) = snapshots {
                write_snapshot(writer, LOCATION_SNAPSHOT_FILE, &names);
            }

            let mut by_location = LocationDevices::new();
            for (location_id, location_name) in &names {
                let members = client.get_devices_in_location(location_id)?;
                debug!(
                    "    {} device(s) in location {} ({})",
                    members.len(),
                    location_id,
                    location_name
                );
                by_location
                    .entry(location_name.clone())
                    .or_default()
                    .extend(summarize(&members));
            }
            if let Some(ref writer) = snapshots {
                write_snapshot(writer, LOCATION_DEVICES_SNAPSHOT_FILE, &by_location);
            }

            Some(LocationIndex::new(names, by_location))
        } else {
            debug!("Location mapping disabled");
            None
        };

        Ok(Self::new(serials, locations))
    }

    /// Resolve a serial number to its device identifier
    pub fn udid_for_serial(&self, serial: &str) -> Option<&str> {
        self.serials.get(serial.trim()).map(String::as_str)
    }

    pub fn serials(&self) -> &SerialIndex {
        &self.serials
    }

    pub fn locations(&self) -> Option<&LocationIndex> {
        self.locations.as_ref()
    }

    pub fn device_count(&self) -> usize {
        self.serials.len()
    }

    pub fn location_count(&self) -> usize {
        self.locations.as_ref().map_or(0, |l| l.names.len())
    }
}

/// Build serial number -> identifier from a device listing
///
/// Devices without a serial number are left out. When two devices share a
/// serial the later one wins.
pub fn index_serials(devices: &[DeviceSummary]) -> SerialIndex {
    let mut index = SerialIndex::new();
    for device in devices {
        match device.serial_number.as_deref() {
            Some(serial) if !serial.is_empty() => {
                if let Some(previous) = index.insert(serial.to_string(), device.udid.clone()) {
                    warn!(
                        "Serial number {} is shared by {} and {}",
                        serial, previous, device.udid
                    );
                }
            }
            _ => debug!("Device {} has no serial number", device.udid),
        }
    }
    index
}

/// Build location id -> name from a location listing
pub fn index_locations(locations: &[Location]) -> LocationNames {
    locations
        .iter()
        .map(|location| (location.id.clone(), location.name.clone()))
        .collect()
}

/// Build identifier -> summary for one location's devices
pub fn summarize(devices: &[DeviceSummary]) -> BTreeMap<String, DeviceEntry> {
    devices
        .iter()
        .map(|device| (device.udid.clone(), DeviceEntry::from(device)))
        .collect()
}

fn write_snapshot<T: Serialize>(writer: &SnapshotWriter, file_name: &str, value: &T) {
    if let Err(e) = writer.write(file_name, value) {
        warn!("Could not write snapshot {}: {}", file_name, e);
    }
}
