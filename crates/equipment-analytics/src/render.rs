//! Plain-text rendering of sessions for the terminal.

use std::fmt::Write as _;

use equipment_core::formatting::{
    format_distribution, format_measurement, format_number, FLOWRATE_UNIT, PRESSURE_UNIT,
    TEMPERATURE_UNIT,
};
use equipment_core::models::UploadSession;
use equipment_core::time_utils::TimezoneHandler;
use equipment_data::aggregator::{ColumnStats, MeasurementStats};

/// Summary block for one session.
pub fn session_summary(session: &UploadSession, tz: &TimezoneHandler) -> String {
    let summary = &session.summary;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Session {}  {}  {}",
        session.id,
        session.file_name,
        tz.format_timestamp(session.created_at)
    );
    let _ = writeln!(out, "  Equipment:    {}", summary.total_count);
    let _ = writeln!(
        out,
        "  Flowrate:     {}",
        format_measurement(summary.avg_flowrate, FLOWRATE_UNIT)
    );
    let _ = writeln!(
        out,
        "  Pressure:     {}",
        format_measurement(summary.avg_pressure, PRESSURE_UNIT)
    );
    let _ = writeln!(
        out,
        "  Temperature:  {}",
        format_measurement(summary.avg_temperature, TEMPERATURE_UNIT)
    );
    let _ = writeln!(
        out,
        "  Types:        {}",
        format_distribution(&summary.equipment_distribution)
    );
    out
}

/// The history listing, newest first as given.
pub fn history_table(sessions: &[UploadSession], tz: &TimezoneHandler) -> String {
    if sessions.is_empty() {
        return "No uploads yet.\n".to_string();
    }

    let file_width = sessions
        .iter()
        .map(|s| s.file_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("File".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<23}  {:<file_width$}  {:>6}  {:>12}  {:>10}  {:>12}",
        "ID", "Uploaded", "File", "Count", "Flowrate", "Pressure", "Temperature"
    );
    for session in sessions {
        let summary = &session.summary;
        let _ = writeln!(
            out,
            "{:>4}  {:<23}  {:<file_width$}  {:>6}  {:>12}  {:>10}  {:>12}",
            session.id.to_string(),
            tz.format_timestamp(session.created_at),
            session.file_name,
            summary.total_count,
            format_number(summary.avg_flowrate, 1),
            format_number(summary.avg_pressure, 1),
            format_number(summary.avg_temperature, 1),
        );
    }
    out
}

/// Summary, column ranges and every row of one session.
pub fn session_detail(session: &UploadSession, tz: &TimezoneHandler) -> String {
    let mut out = session_summary(session, tz);
    let stats = MeasurementStats::from_items(&session.equipment_items);

    let _ = writeln!(out);
    let _ = writeln!(out, "  Range:        {}", range(&stats.flowrate, FLOWRATE_UNIT));
    let _ = writeln!(out, "                {}", range(&stats.pressure, PRESSURE_UNIT));
    let _ = writeln!(out, "                {}", range(&stats.temperature, TEMPERATURE_UNIT));

    if session.equipment_items.is_empty() {
        return out;
    }

    let name_width = session
        .equipment_items
        .iter()
        .map(|i| i.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Equipment Name".len());
    let type_width = session
        .equipment_items
        .iter()
        .map(|i| i.equipment_type.chars().count())
        .max()
        .unwrap_or(0)
        .max("Type".len());

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {:<name_width$}  {:<type_width$}  {:>10}  {:>10}  {:>12}",
        "Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"
    );
    for item in &session.equipment_items {
        let _ = writeln!(
            out,
            "  {:<name_width$}  {:<type_width$}  {:>10}  {:>10}  {:>12}",
            item.name,
            item.equipment_type,
            format_number(item.flowrate, 2),
            format_number(item.pressure, 2),
            format_number(item.temperature, 2),
        );
    }
    out
}

fn range(stats: &ColumnStats, unit: &str) -> String {
    match (stats.min(), stats.max()) {
        (Some(min), Some(max)) => format!(
            "{} .. {} {}",
            format_number(min, 1),
            format_number(max, 1),
            unit
        ),
        _ => format!("- {unit}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use equipment_core::models::{SessionId, UserId};
    use equipment_data::analysis::ingest;

    fn session(csv: &str) -> UploadSession {
        let (summary, items) = ingest(csv.as_bytes()).unwrap().into_parts();
        UploadSession {
            id: SessionId(12),
            user_id: UserId(1),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap(),
            file_name: "plant.csv".to_string(),
            summary,
            equipment_items: items,
        }
    }

    const CSV: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                       Pump-1,Pump,10,5,300\n\
                       Pump-2,Pump,20,7,320\n\
                       Valve-1,Valve,1500,3,290\n";

    #[test]
    fn test_session_summary() {
        let text = session_summary(&session(CSV), &TimezoneHandler::new("UTC"));
        assert!(text.starts_with("Session 12  plant.csv  2024-03-01 08:15:00 UTC\n"));
        assert!(text.contains("Equipment:    3\n"));
        assert!(text.contains("Flowrate:     510.0 units/min\n"));
        assert!(text.contains("Pressure:     5.0 bar\n"));
        assert!(text.contains("Temperature:  303.3 K\n"));
        assert!(text.contains("Types:        Pump 2 (66.7%), Valve 1 (33.3%)\n"));
    }

    #[test]
    fn test_session_summary_in_display_timezone() {
        let text = session_summary(&session(CSV), &TimezoneHandler::new("Asia/Tokyo"));
        assert!(text.contains("2024-03-01 17:15:00 JST"));
    }

    #[test]
    fn test_history_table() {
        let sessions = vec![session(CSV)];
        let text = history_table(&sessions, &TimezoneHandler::new("UTC"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Uploaded"));
        assert!(lines[1].contains("plant.csv"));
        assert!(lines[1].contains("510.0"));
    }

    #[test]
    fn test_history_table_empty() {
        assert_eq!(history_table(&[], &TimezoneHandler::new("UTC")), "No uploads yet.\n");
    }

    #[test]
    fn test_session_detail_lists_rows_and_ranges() {
        let text = session_detail(&session(CSV), &TimezoneHandler::new("UTC"));
        assert!(text.contains("10.0 .. 1,500.0 units/min"));
        assert!(text.contains("3.0 .. 7.0 bar"));
        assert!(text.contains("Valve-1"));
        assert!(text.contains("1,500.00"));
    }

    #[test]
    fn test_session_detail_for_empty_session() {
        let empty = session("Equipment Name,Type,Flowrate,Pressure,Temperature\n");
        let text = session_detail(&empty, &TimezoneHandler::new("UTC"));
        assert!(text.contains("Types:        -"));
        assert!(text.contains("- bar"));
        assert!(!text.contains("Equipment Name"));
    }
}
