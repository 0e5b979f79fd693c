//! Session reports in JSON or CSV.
//!
//! The JSON report carries the summary, per-column statistics, the type
//! distribution with percentage shares and every row. The CSV report carries
//! only the rows, under the upload header, so it can be uploaded again.

use std::io::Write;

use chrono::{DateTime, Utc};
use equipment_core::error::{EquipmentError, Result};
use equipment_core::formatting::share_percentage;
use equipment_core::models::{EquipmentItem, SessionId, UploadSession};
use equipment_core::settings::ReportFormat;
use serde::Serialize;

use crate::aggregator::{ColumnSummary, MeasurementStats};
use crate::validator::REQUIRED_COLUMNS;

/// One distribution entry with its share of the whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionShare {
    pub equipment_type: String,
    pub count: u64,
    /// Percentage of all rows, one decimal place.
    pub percentage: f64,
}

/// Per-column statistics of the three measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnReport {
    pub flowrate: ColumnSummary,
    pub pressure: ColumnSummary,
    pub temperature: ColumnSummary,
}

/// Everything the JSON report contains.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport<'a> {
    pub session_id: SessionId,
    pub file_name: &'a str,
    pub created_at: DateTime<Utc>,
    pub total_count: u64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub columns: ColumnReport,
    pub distribution: Vec<DistributionShare>,
    pub equipment_items: &'a [EquipmentItem],
}

/// Assemble the report data for `session`.
pub fn build_report(session: &UploadSession) -> SessionReport<'_> {
    let stats = MeasurementStats::from_items(&session.equipment_items);
    let summary = &session.summary;
    let total = summary.total_count;

    SessionReport {
        session_id: session.id,
        file_name: &session.file_name,
        created_at: session.created_at,
        total_count: total,
        avg_flowrate: summary.avg_flowrate,
        avg_pressure: summary.avg_pressure,
        avg_temperature: summary.avg_temperature,
        columns: ColumnReport {
            flowrate: ColumnSummary::from(&stats.flowrate),
            pressure: ColumnSummary::from(&stats.pressure),
            temperature: ColumnSummary::from(&stats.temperature),
        },
        distribution: summary
            .equipment_distribution
            .iter()
            .map(|(label, count)| DistributionShare {
                equipment_type: label.to_string(),
                count,
                percentage: share_percentage(count, total, 1),
            })
            .collect(),
        equipment_items: &session.equipment_items,
    }
}

/// Render `session` in the requested format.
pub fn render_report(session: &UploadSession, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(&build_report(session))?),
        ReportFormat::Csv => {
            let mut buf = Vec::new();
            write_items_csv(&session.equipment_items, &mut buf)?;
            String::from_utf8(buf).map_err(|e| EquipmentError::Other(e.into()))
        }
    }
}

/// Write `items` as CSV under the upload header.
pub fn write_items_csv<W: Write>(items: &[EquipmentItem], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(REQUIRED_COLUMNS)?;
    for item in items {
        let flowrate = item.flowrate.to_string();
        let pressure = item.pressure.to_string();
        let temperature = item.temperature.to_string();
        writer.write_record([
            item.name.as_str(),
            item.equipment_type.as_str(),
            flowrate.as_str(),
            pressure.as_str(),
            temperature.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Suggested file name for a saved report, e.g. `Report-2024-03-01.json`.
pub fn report_file_name(session: &UploadSession, format: ReportFormat) -> String {
    format!(
        "Report-{}.{}",
        session.created_at.format("%Y-%m-%d"),
        format.extension()
    )
}
