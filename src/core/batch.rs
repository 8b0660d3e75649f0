//! Sequential notes batch over CSV records
//!
//! Each record is resolved through the session's directory and updated with
//! one blocking round trip. A failed device is logged and the batch moves on;
//! the only way to stop early is the shutdown flag, checked between devices.

use crate::core::outcome::{Failure, Outcome};
use crate::core::records::NoteRecord;
use crate::core::session::NotesSession;
use crate::device::traits::Transport;
use log::{error, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Progress update sent before each device is processed
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Serial number of the current record (empty if the row has none)
    pub serial_number: String,
    /// 1-based index of the current record
    pub current_index: usize,
    /// Number of records in the batch
    pub total: usize,
}

/// A record that could not be updated
#[derive(Debug, Clone, Serialize)]
pub struct DeviceFailure {
    /// Row number in the input file
    pub line: usize,
    pub serial_number: Option<String>,
    pub failure: Failure,
}

/// Summary of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    /// Rows without notes text
    pub skipped: usize,
    pub failures: Vec<DeviceFailure>,
    /// The shutdown flag stopped the batch before the last record
    pub interrupted: bool,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.skipped + self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated, {} failed, {} skipped of {} record(s) in {:.1}s",
            self.succeeded,
            self.failed(),
            self.skipped,
            self.total,
            self.duration_ms as f64 / 1000.0
        )?;
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

/// Runs the notes batch
pub struct NotesBatch {
    shutdown_flag: Arc<AtomicBool>,
    progress_callback: Option<Box<dyn Fn(BatchProgress) + Send + Sync>>,
}

impl Default for NotesBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl NotesBatch {
    pub fn new() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            progress_callback: None,
        }
    }

    /// Share a shutdown flag (e.g. the Ctrl+C handler's)
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = flag;
        self
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Update every record in order
    pub fn run<T: Transport>(
        &self,
        session: &NotesSession<T>,
        records: &[NoteRecord],
    ) -> BatchReport {
        let start_time = Instant::now();
        let mut report = BatchReport {
            total: records.len(),
            ..Default::default()
        };

        info!("Updating device notes for {} device(s)", records.len());

        for (index, record) in records.iter().enumerate() {
            if self.is_shutdown_requested() {
                warn!(
                    "Batch cancelled by user after {} of {} record(s)",
                    index,
                    records.len()
                );
                report.interrupted = true;
                break;
            }

            let serial = record.serial_number.clone().unwrap_or_default();
            if let Some(ref callback) = self.progress_callback {
                callback(BatchProgress {
                    serial_number: serial.clone(),
                    current_index: index + 1,
                    total: records.len(),
                });
            }

            info!("    updating device: {}", serial);

            let Some(ref notes) = record.notes else {
                warn!("    row {} has no notes, skipping {}", record.line, serial);
                report.skipped += 1;
                continue;
            };

            let outcome = match record.serial_number {
                Some(ref serial) => session.update_notes_for_serial(serial, notes),
                None => Failure::missing_serial().into(),
            };

            match outcome {
                Outcome::Success { .. } => {
                    info!("    successfully added notes: {}", notes);
                    report.succeeded += 1;
                }
                Outcome::Failure(failure) => {
                    log_failure(record, &failure);
                    report.failures.push(DeviceFailure {
                        line: record.line,
                        serial_number: record.serial_number.clone(),
                        failure,
                    });
                }
            }
        }

        report.duration_ms = start_time.elapsed().as_millis() as u64;
        info!("Batch complete: {}", report);
        report
    }
}

fn log_failure(record: &NoteRecord, failure: &Failure) {
    error!("    device update failed! (row {})", record.line);
    error!(
        "\n    OK:        false\n    Stage:     {}\n    Status:    {}\n    Error:     {}\n    Response:  {}",
        failure.stage,
        failure
            .status
            .map_or_else(|| "None".to_string(), |s| s.to_string()),
        failure.error.as_deref().unwrap_or("None"),
        failure
            .response
            .as_ref()
            .map_or_else(|| "None".to_string(), |r| r.to_string()),
    );
}
