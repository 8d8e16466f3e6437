//! Human-readable GMT timestamps
//!
//! Used both for the `Date` response header and for the date marker
//! substitution in served files.

use chrono::{DateTime, Utc};

/// Medium date-time style, e.g. `Oct 16, 2026, 3:04:05 PM`
pub const DATE_FORMAT: &str = "%b %-d, %Y, %-I:%M:%S %p";

pub fn format_gmt(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

pub fn now_gmt() -> String {
    format_gmt(Utc::now())
}
