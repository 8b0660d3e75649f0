//! End-to-end workflow tests against the mock API
//!
//! These run the same path the `update-notes` command does: build the
//! directory (with snapshots), load a CSV file, and run the batch.

use super::{sample_fleet, Fault};
use crate::core::batch::NotesBatch;
use crate::core::directory::{DirectoryOptions, LocationDevices, SerialIndex};
use crate::core::notes::NOTES_SEPARATOR;
use crate::core::outcome::FailureKind;
use crate::core::records::load_csv;
use crate::core::session::NotesSession;
use crate::core::snapshot::{LOCATION_DEVICES_SNAPSHOT_FILE, SERIAL_SNAPSHOT_FILE};
use crate::device::traits::Method;
use std::fs;
use tempfile::TempDir;

fn write_csv(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("deviceList.csv");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_csv_to_notes_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let csv = write_csv(
        &temp_dir,
        "SerialNumber,Notes\n\
         F9FXK0Q1HLF9,Screen replaced\n\
         DMPXQ2ZJKD6L,Issued to room 12\n\
         NOPE00000000,Should not resolve\n",
    );

    let api = sample_fleet();
    let options = DirectoryOptions::default().snapshot_dir(Some(temp_dir.path().to_path_buf()));
    let session = NotesSession::connect(&api, &options).unwrap();
    let calls_after_connect = api.request_count();
    assert_eq!(calls_after_connect, 1 + 1 + 2);

    let records = load_csv(&csv).unwrap();
    let report = NotesBatch::new().run(&session, &records);

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].failure.kind, FailureKind::UnresolvedSerial);
    assert_eq!(report.failures[0].line, 4);

    // One GET and one POST per resolved device; nothing for the unresolved one.
    assert_eq!(api.request_count(), calls_after_connect + 4);

    assert_eq!(
        api.notes_of("udid-0001").unwrap(),
        format!("Asset tag 1001{}Screen replaced", NOTES_SEPARATOR)
    );
    assert_eq!(
        api.notes_of("udid-0002").unwrap(),
        format!("{}Issued to room 12", NOTES_SEPARATOR)
    );

    let serials: SerialIndex = serde_json::from_str(
        &fs::read_to_string(temp_dir.path().join(SERIAL_SNAPSHOT_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(serials.len(), 5);

    let by_location: LocationDevices = serde_json::from_str(
        &fs::read_to_string(temp_dir.path().join(LOCATION_DEVICES_SNAPSHOT_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(by_location["Main Campus"].len(), 2);
    assert_eq!(by_location["North Annex"].len(), 2);
}

#[test]
fn test_rerun_appends_again() {
    let temp_dir = TempDir::new().unwrap();
    let csv = write_csv(&temp_dir, "serial_number,notes\nGG7DL4C3Q1GC,Checked\n");
    let api = sample_fleet();
    let records = load_csv(&csv).unwrap();

    for _ in 0..2 {
        let session = NotesSession::connect(&api, &DirectoryOptions::serials_only()).unwrap();
        let report = NotesBatch::new().run(&session, &records);
        assert!(report.all_succeeded());
    }

    assert_eq!(
        api.notes_of("udid-0004").unwrap(),
        format!("Cart B{sep}Checked{sep}Checked", sep = NOTES_SEPARATOR)
    );
}

#[test]
fn test_server_errors_do_not_stop_batch() {
    let temp_dir = TempDir::new().unwrap();
    let csv = write_csv(
        &temp_dir,
        "Serial_Number,Notes\n\
         F9FXK0Q1HLF9,a\n\
         DMPXQ2ZJKD6L,b\n\
         C02ZK1ABMD6R,c\n",
    );
    let api = sample_fleet()
        .with_fault(Fault::status(Method::Get, "devices/udid-0001", 500, "Internal Server Error"))
        .with_fault(Fault::connection_refused(Method::Post, "devices/udid-0002/details"));
    let session = NotesSession::connect(&api, &DirectoryOptions::serials_only()).unwrap();

    let report = NotesBatch::new().run(&session, &load_csv(&csv).unwrap());

    assert_eq!(report.succeeded, 1);
    let kinds: Vec<FailureKind> = report.failures.iter().map(|f| f.failure.kind).collect();
    assert_eq!(kinds, vec![FailureKind::HttpStatus, FailureKind::Connection]);
    assert_eq!(report.failures[0].failure.status, Some(500));
    assert_eq!(api.notes_of("udid-0001").as_deref(), Some("Asset tag 1001"));
    assert_eq!(api.notes_of("udid-0003").unwrap(), format!("{}c", NOTES_SEPARATOR));
}

#[test]
fn test_directory_failure_aborts_before_any_update() {
    let api = sample_fleet().with_fault(Fault::status(Method::Get, "devices", 401, "Unauthorized"));
    let result = NotesSession::connect(&api, &DirectoryOptions::default().snapshot_dir(None));
    assert!(result.is_err());
    assert_eq!(api.count_requests(Method::Post), 0);
    assert_eq!(api.request_count(), 1);
}
