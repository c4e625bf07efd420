//! Receive timestamps attached to every envelope.

use chrono::{Local, NaiveDateTime};

/// `strftime` pattern for envelope timestamps, e.g. `2024-05-01 12:30:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current host-local time at second resolution.
pub fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp produced by [`now`]. Returns `None` for anything else.
pub fn parse(timestamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()
}
