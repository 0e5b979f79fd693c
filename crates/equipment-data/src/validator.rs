//! Schema check that gates aggregation.

use equipment_core::error::{EquipmentError, Result};

use crate::table::RawTable;

pub const COL_NAME: &str = "Equipment Name";
pub const COL_TYPE: &str = "Type";
pub const COL_FLOWRATE: &str = "Flowrate";
pub const COL_PRESSURE: &str = "Pressure";
pub const COL_TEMPERATURE: &str = "Temperature";

/// Columns every upload must carry, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_NAME,
    COL_TYPE,
    COL_FLOWRATE,
    COL_PRESSURE,
    COL_TEMPERATURE,
];

/// Positions of the required columns inside a validated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub name: usize,
    pub equipment_type: usize,
    pub flowrate: usize,
    pub pressure: usize,
    pub temperature: usize,
}

/// A [`RawTable`] known to contain every required column.
///
/// Only [`validate`] constructs one. The wrapped table is unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTable {
    table: RawTable,
    columns: ColumnIndex,
}

impl ValidatedTable {
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn columns(&self) -> ColumnIndex {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn into_inner(self) -> RawTable {
        self.table
    }
}

/// Check that all five required columns are present.
///
/// Column order and extra columns do not matter, and any row count, zero
/// included, is accepted. On failure the error carries the full required list
/// together with the names that were missing.
pub fn validate(table: RawTable) -> Result<ValidatedTable> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !table.has_column(name))
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(EquipmentError::Schema {
            required: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            missing,
        });
    }

    let position = |name: &str| table.column_index(name).unwrap_or_default();
    let columns = ColumnIndex {
        name: position(COL_NAME),
        equipment_type: position(COL_TYPE),
        flowrate: position(COL_FLOWRATE),
        pressure: position(COL_PRESSURE),
        temperature: position(COL_TEMPERATURE),
    };

    Ok(ValidatedTable { table, columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(headers: &[&str]) -> RawTable {
        RawTable::new(headers.iter().copied())
    }

    fn missing_of(err: EquipmentError) -> (Vec<String>, Vec<String>) {
        match err {
            EquipmentError::Schema { required, missing } => (required, missing),
            other => panic!("expected schema error, got {other}"),
        }
    }

    #[test]
    fn test_validate_accepts_required_columns() {
        let validated = validate(table_with(&REQUIRED_COLUMNS)).unwrap();
        assert_eq!(validated.row_count(), 0);
        assert_eq!(validated.columns().name, 0);
        assert_eq!(validated.columns().temperature, 4);
    }

    #[test]
    fn test_validate_ignores_order_and_extra_columns() {
        let headers = ["Temperature", "Notes", "Type", "Pressure", "Equipment Name", "Flowrate"];
        let validated = validate(table_with(&headers)).unwrap();
        let columns = validated.columns();
        assert_eq!(columns.temperature, 0);
        assert_eq!(columns.equipment_type, 2);
        assert_eq!(columns.name, 4);
        assert_eq!(columns.flowrate, 5);
        assert_eq!(validated.table().headers().len(), 6);
    }

    #[test]
    fn test_validate_returns_table_unchanged() {
        let table = table_with(&REQUIRED_COLUMNS)
            .with_row(["B", "Valve", "1", "2", "3"])
            .unwrap()
            .with_row(["A", "Pump", "4", "5", "6"])
            .unwrap();
        let validated = validate(table.clone()).unwrap();
        assert_eq!(validated.into_inner(), table);
    }

    #[test]
    fn test_validate_missing_pressure_lists_all_required() {
        let headers = ["Equipment Name", "Type", "Flowrate", "Temperature"];
        let err = validate(table_with(&headers)).unwrap_err();
        let (required, missing) = missing_of(err);
        assert_eq!(required, REQUIRED_COLUMNS.map(String::from).to_vec());
        assert_eq!(missing, vec!["Pressure".to_string()]);
    }

    #[test]
    fn test_validate_is_case_and_name_exact() {
        let err = validate(table_with(&[
            "equipment name",
            "Type",
            "Flowrate ",
            "Pressure",
            "Temperature",
        ]))
        .unwrap_err();
        let (_, missing) = missing_of(err);
        assert_eq!(missing, vec!["Equipment Name".to_string(), "Flowrate".to_string()]);
    }

    #[test]
    fn test_validate_no_columns() {
        let (_, missing) = missing_of(validate(RawTable::default()).unwrap_err());
        assert_eq!(missing.len(), 5);
    }

    #[test]
    fn test_validate_fails_iff_some_required_column_absent() {
        // Drop each required column in turn, with an extra column present.
        for skip in 0..REQUIRED_COLUMNS.len() {
            let mut headers: Vec<&str> = vec!["Site"];
            headers.extend(
                REQUIRED_COLUMNS
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != skip)
                    .map(|(_, c)| *c),
            );
            let (_, missing) = missing_of(validate(table_with(&headers)).unwrap_err());
            assert_eq!(missing, vec![REQUIRED_COLUMNS[skip].to_string()]);
        }

        let mut reversed = REQUIRED_COLUMNS.to_vec();
        reversed.reverse();
        assert!(validate(table_with(&reversed)).is_ok());
    }
}
