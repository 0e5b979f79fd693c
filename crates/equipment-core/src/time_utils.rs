use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve the `"auto"` sentinel to the system timezone; any other value is
/// returned unchanged.
pub fn resolve_timezone(name: &str) -> String {
    if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    }
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Renders UTC timestamps in a configured display timezone.
pub struct TimezoneHandler {
    display_tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// An unrecognised name falls back to UTC with a warning.
    pub fn new(tz_name: &str) -> Self {
        let display_tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { display_tz }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn display_tz(&self) -> Tz {
        self.display_tz
    }

    /// Convert a UTC timestamp into the display timezone.
    pub fn to_local(&self, dt: DateTime<Utc>) -> DateTime<Tz> {
        dt.with_timezone(&self.display_tz)
    }

    /// Format a UTC timestamp as `"YYYY-MM-DD HH:MM:SS TZ"` in the display
    /// timezone.
    pub fn format_timestamp(&self, dt: DateTime<Utc>) -> String {
        self.to_local(dt).format("%Y-%m-%d %H:%M:%S %Z").to_string()
    }
}
