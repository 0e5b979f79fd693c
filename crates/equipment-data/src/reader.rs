//! CSV decoding into a [`RawTable`].
//!
//! The first record is the header row. Header names are kept exactly as
//! written; empty fields become [`Cell::Empty`] and every other field is kept
//! as verbatim text for the aggregator to coerce.

use std::io::Read;
use std::path::Path;

use equipment_core::error::{EquipmentError, Result};

use crate::table::{Cell, RawTable};

// ── Public API ────────────────────────────────────────────────────────────────

/// Decode comma-separated UTF-8 input with a header row.
///
/// A record with the wrong number of fields, or one that is not valid UTF-8,
/// fails with [`EquipmentError::Ingestion`] naming its 1-based data row.
/// Input without any header row yields a table with no columns.
pub fn read_table<R: Read>(input: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers().map_err(|e| EquipmentError::Ingestion {
        row: None,
        column: None,
        reason: format!("unreadable header row: {}", e),
    })?;
    let mut table = RawTable::new(headers.iter());

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| EquipmentError::row(index + 1, record_error_reason(&e)))?;
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        table.push_row(cells)?;
    }

    Ok(table)
}

/// Decode an in-memory upload.
pub fn read_table_from_bytes(bytes: &[u8]) -> Result<RawTable> {
    read_table(bytes)
}

/// Decode a CSV file from disk.
pub fn read_table_from_path(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).map_err(|source| EquipmentError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    read_table(std::io::BufReader::new(file))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn record_error_reason(error: &csv::Error) -> String {
    match error.kind() {
        csv::ErrorKind::Utf8 { .. } => "record is not valid UTF-8".to_string(),
        _ => error.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
