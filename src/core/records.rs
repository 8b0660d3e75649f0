//! CSV input of serial numbers and notes
//!
//! Exports from different tools spell the columns differently. Each row is
//! normalized to a [`NoteRecord`]: the serial comes from the first non-empty
//! of `SerialNumber`, `serial_number`, `Serial_Number`; the notes from the
//! first non-empty of `Notes`, `notes`.

use crate::core::error::{ApiError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Accepted spellings of the serial number column, in priority order
pub const SERIAL_COLUMNS: &[&str] = &["SerialNumber", "serial_number", "Serial_Number"];

/// Accepted spellings of the notes column, in priority order
pub const NOTES_COLUMNS: &[&str] = &["Notes", "notes"];

/// One input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    /// 1-based row number, counting the header as row 1
    pub line: usize,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

/// Load records from a CSV file
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<NoteRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ApiError::Csv {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    read_records(file, &path.display().to_string())
}

/// Load records from any reader; `source` names it in errors
pub fn read_records<R: Read>(reader: R, source: &str) -> Result<Vec<NoteRecord>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| csv_error(source, &e))?
        .clone();

    let serial_columns = column_positions(&headers, SERIAL_COLUMNS);
    let notes_columns = column_positions(&headers, NOTES_COLUMNS);
    if serial_columns.is_empty() {
        debug!("{}: no serial number column among {:?}", source, SERIAL_COLUMNS);
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| csv_error(source, &e))?;
        records.push(NoteRecord {
            line: index + 2,
            serial_number: first_non_empty(&row, &serial_columns).map(|s| s.trim().to_string()),
            notes: first_non_empty(&row, &notes_columns).map(str::to_string),
        });
    }

    debug!("Loaded {} record(s) from {}", records.len(), source);
    Ok(records)
}

fn column_positions(headers: &StringRecord, names: &[&str]) -> Vec<usize> {
    names
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == *name))
        .collect()
}

fn first_non_empty<'r>(row: &'r StringRecord, columns: &[usize]) -> Option<&'r str> {
    columns
        .iter()
        .filter_map(|&i| row.get(i))
        .find(|value| !value.trim().is_empty())
}

fn csv_error(source: &str, err: &csv::Error) -> ApiError {
    ApiError::Csv {
        path: source.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn parse(text: &str) -> Vec<NoteRecord> {
        read_records(text.as_bytes(), "test.csv").unwrap()
    }

    #[test]
    fn test_canonical_headers() {
        let records = parse("SerialNumber,Notes\nSN1,cracked screen\nSN2,new case\n");
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            NoteRecord {
                line: 2,
                serial_number: Some("SN1".to_string()),
                notes: Some("cracked screen".to_string()),
            }
        );
        assert_eq!(records[1].line, 3);
    }

    #[test]
    fn test_alternate_spellings() {
        let records = parse("serial_number,notes\nSN1,a\n");
        assert_eq!(records[0].serial_number.as_deref(), Some("SN1"));
        assert_eq!(records[0].notes.as_deref(), Some("a"));

        let records = parse("Serial_Number,Notes\nSN2,b\n");
        assert_eq!(records[0].serial_number.as_deref(), Some("SN2"));
    }

    #[test]
    fn test_first_non_empty_column_wins() {
        let records = parse("SerialNumber,serial_number,Notes\n,SN-FALLBACK,x\nSN-MAIN,SN-OTHER,y\n");
        assert_eq!(records[0].serial_number.as_deref(), Some("SN-FALLBACK"));
        assert_eq!(records[1].serial_number.as_deref(), Some("SN-MAIN"));
    }

    #[test]
    fn test_missing_columns_and_values() {
        let records = parse("Asset Tag,Notes\n1234,hello\n");
        assert_eq!(records[0].serial_number, None);
        assert_eq!(records[0].notes.as_deref(), Some("hello"));

        let records = parse("SerialNumber,Notes\nSN1,\nSN2\n");
        assert_eq!(records[0].notes, None);
        assert_eq!(records[1].notes, None);
    }

    #[test]
    fn test_serial_trimmed_notes_kept() {
        let records = parse("SerialNumber , Notes\n SN1 ,\"line one\nline two\"\n");
        assert_eq!(records[0].serial_number.as_deref(), Some("SN1"));
        assert_eq!(records[0].notes.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_load_csv_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deviceList.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "SerialNumber,Notes").unwrap();
        writeln!(file, "SN1,note").unwrap();
        drop(file);

        let records = load_csv(&path).unwrap();
        assert_eq!(records.len(), 1);

        let missing = load_csv(temp_dir.path().join("missing.csv"));
        assert!(matches!(missing, Err(ApiError::Csv { .. })));
    }
}
