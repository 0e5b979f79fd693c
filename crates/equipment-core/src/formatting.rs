//! Human-readable rendering of summary figures.

use crate::models::EquipmentDistribution;

/// Display units for the three measured columns.
pub const FLOWRATE_UNIT: &str = "units/min";
pub const PRESSURE_UNIT: &str = "bar";
pub const TEMPERATURE_UNIT: &str = "K";

/// Format a number with thousands separators and a fixed number of decimals.
///
/// # Examples
///
/// ```
/// use equipment_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(-9876.54, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    // "-0.0" reads badly in a summary line.
    if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a measurement with one decimal place and its unit, e.g. `"300.0 K"`.
pub fn format_measurement(value: f64, unit: &str) -> String {
    format!("{} {}", format_number(value, 1), unit)
}

/// Share of `count` in `total` as a percentage rounded to `decimal_places`.
///
/// Returns `0.0` when `total` is zero.
pub fn share_percentage(count: u64, total: u64, decimal_places: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

/// One-line rendering of a distribution: `"Pump 2 (66.7%), Valve 1 (33.3%)"`.
///
/// An empty distribution renders as `"-"`.
pub fn format_distribution(distribution: &EquipmentDistribution) -> String {
    if distribution.is_empty() {
        return "-".to_string();
    }
    let total = distribution.total();
    distribution
        .iter()
        .map(|(label, count)| {
            format!(
                "{} {} ({:.1}%)",
                label,
                count,
                share_percentage(count, total, 1)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_no_thousands() {
        assert_eq!(format_number(123.24, 1), "123.2");
        assert_eq!(format_number(999.0, 0), "999");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_000.0, 0), "1,000");
        assert_eq!(format_number(123_456_789.0, 0), "123,456,789");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
        assert_eq!(format_number(-0.01, 1), "0.0");
    }

    // ── format_measurement ───────────────────────────────────────────────────

    #[test]
    fn test_format_measurement() {
        assert_eq!(format_measurement(300.0, TEMPERATURE_UNIT), "300.0 K");
        assert_eq!(format_measurement(1520.24, PRESSURE_UNIT), "1,520.2 bar");
    }

    // ── share_percentage ─────────────────────────────────────────────────────

    #[test]
    fn test_share_percentage() {
        assert!((share_percentage(1, 4, 1) - 25.0).abs() < 1e-9);
        assert!((share_percentage(2, 3, 1) - 66.7).abs() < 1e-9);
        assert_eq!(share_percentage(5, 0, 2), 0.0);
    }

    // ── format_distribution ──────────────────────────────────────────────────

    #[test]
    fn test_format_distribution() {
        let d: EquipmentDistribution = ["Pump", "Valve", "Pump"].into_iter().collect();
        assert_eq!(format_distribution(&d), "Pump 2 (66.7%), Valve 1 (33.3%)");
    }

    #[test]
    fn test_format_distribution_empty() {
        assert_eq!(format_distribution(&EquipmentDistribution::new()), "-");
    }
}
