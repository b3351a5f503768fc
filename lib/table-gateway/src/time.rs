use chrono::{DateTime, NaiveDate, Utc};

/// Current time truncated to microseconds, the precision of `TIMESTAMPTZ`.
///
/// Values written with this compare equal after a database round trip.
pub fn now() -> DateTime<Utc> {
    truncate_micros(Utc::now())
}

/// Current UTC calendar day.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn truncate_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    match DateTime::from_timestamp_micros(dt.timestamp_micros()) {
        Some(time) => time,
        None => DateTime::<Utc>::from_timestamp_nanos(0),
    }
}
