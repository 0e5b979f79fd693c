//! Summary statistics over a validated equipment table.

use equipment_core::error::{EquipmentError, Result};
use equipment_core::models::{EquipmentDistribution, EquipmentItem, SessionSummary};
use serde::Serialize;

use crate::table::{Cell, CoercionError, Row};
use crate::validator::{
    ValidatedTable, COL_FLOWRATE, COL_NAME, COL_PRESSURE, COL_TEMPERATURE, COL_TYPE,
};

// ── ColumnStats ───────────────────────────────────────────────────────────────

/// 2^-64. Scaling by a power of two is exact, so the scaled sum only differs
/// from the plain sum when the plain sum overflows.
const OVERFLOW_SCALE: f64 = 1.0 / 18_446_744_073_709_551_616.0;

/// Running totals for one numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub count: u64,
    pub sum: f64,
    /// `sum` accumulated at [`OVERFLOW_SCALE`], used once `sum` overflows.
    scaled_sum: f64,
    min: f64,
    max: f64,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            scaled_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl ColumnStats {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.scaled_sum += value * OVERFLOW_SCALE;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// `sum / count`, or `0.0` when nothing was added.
    ///
    /// Finite values whose sum overflows `f64` still give a finite mean.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let count = self.count as f64;
        if self.sum.is_finite() {
            self.sum / count
        } else {
            self.scaled_sum / count / OVERFLOW_SCALE
        }
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

/// Serialisable view of a [`ColumnStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub mean: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl From<&ColumnStats> for ColumnSummary {
    fn from(stats: &ColumnStats) -> Self {
        Self {
            mean: stats.mean(),
            min: stats.min(),
            max: stats.max(),
        }
    }
}

// ── MeasurementStats ──────────────────────────────────────────────────────────

/// Column statistics for flowrate, pressure and temperature together.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeasurementStats {
    pub flowrate: ColumnStats,
    pub pressure: ColumnStats,
    pub temperature: ColumnStats,
}

impl MeasurementStats {
    pub fn add_item(&mut self, item: &EquipmentItem) {
        self.flowrate.add(item.flowrate);
        self.pressure.add(item.pressure);
        self.temperature.add(item.temperature);
    }

    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a EquipmentItem>) -> Self {
        let mut stats = Self::default();
        for item in items {
            stats.add_item(item);
        }
        stats
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// The summary of a table together with the rows it summarises.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub summary: SessionSummary,
    /// One item per input row, in input order.
    pub items: Vec<EquipmentItem>,
}

impl Aggregation {
    pub fn into_parts(self) -> (SessionSummary, Vec<EquipmentItem>) {
        (self.summary, self.items)
    }
}

// ── EquipmentAggregator ───────────────────────────────────────────────────────

/// Stateless aggregation over validated tables.
pub struct EquipmentAggregator;

impl EquipmentAggregator {
    /// Convert every row to an [`EquipmentItem`] and summarise them.
    ///
    /// Means are the plain sum of coerced values divided by the row count;
    /// an empty table gives zero counts, `0.0` means and an empty
    /// distribution. The distribution lists type labels verbatim in order of
    /// first appearance.
    ///
    /// Numeric cells are parsed as `f64` after trimming whitespace. Text that
    /// parses to a non-finite value (`NaN`, `inf`, `-inf`) is rejected like
    /// any other non-numeric text. Any cell that cannot be coerced aborts the
    /// whole aggregation with [`EquipmentError::Ingestion`] naming its row
    /// and column.
    pub fn aggregate(table: &ValidatedTable) -> Result<Aggregation> {
        let items = table
            .table()
            .rows()
            .map(|row| Self::to_item(table, row))
            .collect::<Result<Vec<_>>>()?;
        let summary = Self::summarize(&items);

        finite_mean(COL_FLOWRATE, summary.avg_flowrate)?;
        finite_mean(COL_PRESSURE, summary.avg_pressure)?;
        finite_mean(COL_TEMPERATURE, summary.avg_temperature)?;

        Ok(Aggregation { summary, items })
    }

    /// Summary statistics of an already-converted item list.
    pub fn summarize(items: &[EquipmentItem]) -> SessionSummary {
        let stats = MeasurementStats::from_items(items);
        let equipment_distribution: EquipmentDistribution =
            items.iter().map(|item| item.equipment_type.as_str()).collect();

        SessionSummary {
            total_count: items.len() as u64,
            avg_flowrate: stats.flowrate.mean(),
            avg_pressure: stats.pressure.mean(),
            avg_temperature: stats.temperature.mean(),
            equipment_distribution,
        }
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn to_item(table: &ValidatedTable, row: Row<'_>) -> Result<EquipmentItem> {
        let columns = table.columns();
        Ok(EquipmentItem {
            name: text_cell(&row, columns.name, COL_NAME)?,
            equipment_type: text_cell(&row, columns.equipment_type, COL_TYPE)?,
            flowrate: number_cell(&row, columns.flowrate, COL_FLOWRATE)?,
            pressure: number_cell(&row, columns.pressure, COL_PRESSURE)?,
            temperature: number_cell(&row, columns.temperature, COL_TEMPERATURE)?,
        })
    }
}

fn cell_at<'a>(row: &Row<'a>, index: usize, column: &str) -> Result<&'a Cell> {
    row.at(index).ok_or_else(|| {
        EquipmentError::cell(row.number(), column, CoercionError::Missing.to_string())
    })
}

fn text_cell(row: &Row<'_>, index: usize, column: &str) -> Result<String> {
    cell_at(row, index, column)?
        .to_text()
        .map(|text| text.into_owned())
        .map_err(|e| EquipmentError::cell(row.number(), column, e.to_string()))
}

fn finite_mean(column: &str, mean: f64) -> Result<()> {
    if mean.is_finite() {
        return Ok(());
    }
    Err(EquipmentError::Ingestion {
        row: None,
        column: Some(column.to_string()),
        reason: format!("mean {mean} is not a finite number"),
    })
}

fn number_cell(row: &Row<'_>, index: usize, column: &str) -> Result<f64> {
    cell_at(row, index, column)?
        .to_f64()
        .map_err(|e| EquipmentError::cell(row.number(), column, e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
