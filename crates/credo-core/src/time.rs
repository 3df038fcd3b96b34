//! Microsecond timestamps. Every time value on the wire is an integer count
//! of microseconds since the Unix epoch.

use chrono::{DateTime, Utc};

use crate::error::CoreError;

pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Current time in microseconds since the epoch.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

pub fn micros_from_secs(secs: u64) -> i64 {
    i64::try_from(secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(MICROS_PER_SECOND)
}

/// Convert a microsecond timestamp to a UTC datetime.
pub fn to_datetime(micros: i64) -> Result<DateTime<Utc>, CoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| CoreError::InvalidTimestamp(format!("{} is out of range", micros)))
}
