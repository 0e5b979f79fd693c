//! Ingestion pipeline: decode, validate, aggregate.

use std::path::Path;

use equipment_core::error::Result;

use crate::aggregator::{Aggregation, EquipmentAggregator};
use crate::reader::{read_table_from_bytes, read_table_from_path};
use crate::table::RawTable;
use crate::validator::validate;

/// Run the full pipeline over raw CSV bytes.
///
/// Returns either the complete summary with all of its rows, or the first
/// schema / ingestion error encountered. Nothing partial is ever returned.
pub fn ingest(bytes: &[u8]) -> Result<Aggregation> {
    ingest_table(read_table_from_bytes(bytes)?)
}

/// [`ingest`] for a CSV file on disk.
pub fn ingest_path(path: &Path) -> Result<Aggregation> {
    ingest_table(read_table_from_path(path)?)
}

/// Validate and aggregate an already decoded table.
pub fn ingest_table(table: RawTable) -> Result<Aggregation> {
    let validated = validate(table)?;
    EquipmentAggregator::aggregate(&validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use equipment_core::error::EquipmentError;
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature";

    #[test]
    fn test_ingest_two_rows() {
        let csv = format!("{HEADER}\nPump-1,Pump,10.0,5.0,300.0\nValve-1,Valve,10.0,5.0,300.0\n");
        let (summary, items) = ingest(csv.as_bytes()).unwrap().into_parts();

        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.avg_flowrate, 10.0);
        assert_eq!(summary.equipment_distribution.get("Pump"), Some(1));
        assert_eq!(summary.equipment_distribution.get("Valve"), Some(1));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_ingest_missing_pressure_is_schema_error() {
        let csv = "Equipment Name,Type,Flowrate,Temperature\nPump-1,Pump,10,300\n";
        let err = ingest(csv.as_bytes()).unwrap_err();
        match err {
            EquipmentError::Schema { required, missing } => {
                assert_eq!(
                    required,
                    vec!["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"]
                );
                assert_eq!(missing, vec!["Pressure"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ingest_schema_checked_before_cells() {
        // Bad numbers must not mask the missing column.
        let csv = "Equipment Name,Type,Flowrate\nPump-1,Pump,N/A\n";
        assert!(matches!(
            ingest(csv.as_bytes()),
            Err(EquipmentError::Schema { .. })
        ));
    }

    #[test]
    fn test_ingest_non_numeric_flowrate() {
        let csv = format!("{HEADER}\nPump-1,Pump,N/A,5.0,300.0\n");
        let err = ingest(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, EquipmentError::Ingestion { .. }));
        assert!(err.to_string().contains("Flowrate"));
    }

    #[test]
    fn test_ingest_header_only_gives_empty_summary() {
        let agg = ingest(format!("{HEADER}\n").as_bytes()).unwrap();
        assert_eq!(agg.summary.total_count, 0);
        assert_eq!(agg.summary.avg_temperature, 0.0);
    }

    #[test]
    fn test_ingest_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("units.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Type,Temperature,Equipment Name,Pressure,Flowrate,Site").unwrap();
        writeln!(file, "Compressor,320,C-1,20,95,North").unwrap();
        drop(file);

        let agg = ingest_path(&path).unwrap();
        assert_eq!(agg.items[0].name, "C-1");
        assert_eq!(agg.summary.avg_flowrate, 95.0);
    }
}
