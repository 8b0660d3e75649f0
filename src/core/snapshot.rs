//! Diagnostic JSON snapshots of the device directory
//!
//! Snapshots are written once per run, pretty-printed, and overwrite the
//! previous files. Nothing reads them back.

use crate::core::error::{ApiError, Result};
use log::debug;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serial number -> identifier
pub const SERIAL_SNAPSHOT_FILE: &str = "DeviceDict.json";

/// Location id -> location name
pub const LOCATION_SNAPSHOT_FILE: &str = "LocationDict.json";

/// Location name -> identifier -> device summary
pub const LOCATION_DEVICES_SNAPSHOT_FILE: &str = "LocationDeviceDict.json";

/// Writes snapshot files into one directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    directory: PathBuf,
}

impl SnapshotWriter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Serialize `value` as pretty JSON into `file_name`, replacing any previous file
    pub fn write<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        if !self.directory.as_os_str().is_empty() && !self.directory.exists() {
            fs::create_dir_all(&self.directory).map_err(|e| {
                ApiError::Io(format!(
                    "Failed to create snapshot directory '{}': {}",
                    self.directory.display(),
                    e
                ))
            })?;
        }

        let path = self.directory.join(file_name);
        let file = File::create(&path).map_err(|e| {
            ApiError::Io(format!(
                "Failed to create snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|e| {
            ApiError::Io(format!("Failed to write snapshot '{}': {}", path.display(), e))
        })?;
        writer.flush()?;

        debug!("Wrote snapshot {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_write_pretty_json() {
        let temp_dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(temp_dir.path());

        let mut map = BTreeMap::new();
        map.insert("SN001".to_string(), "udid-1".to_string());
        let path = writer.write(SERIAL_SNAPSHOT_FILE, &map).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n"));
        let parsed: BTreeMap<String, String> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn test_write_overwrites_and_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("snapshots").join("today");
        let writer = SnapshotWriter::new(&nested);

        writer.write("x.json", &vec![1, 2, 3]).unwrap();
        let path = writer.write("x.json", &vec![4]).unwrap();

        let parsed: Vec<i32> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, vec![4]);
    }
}
