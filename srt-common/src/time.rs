//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Unix epoch milliseconds for a timestamp
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}
