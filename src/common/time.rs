//! Simple time helpers used by multiple services.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Current timestamp in milliseconds since the Unix epoch.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Calendar date in the server's local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Wall-clock instant used to stamp history records.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}
