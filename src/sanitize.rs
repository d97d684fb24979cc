use chrono::{Duration, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

use crate::types::Alert;

/// Fields which are either internal bookkeeping or tend to confuse the text generator.
pub const REMOVED_FIELDS: &[&str] = &[
    "Id",
    "publish_date",
    "effective_date",
    "expiry_date",
    "tweet_text",
    "toot_text",
];

pub const TIMESTAMP_FIELDS: &[&str] = &["start_timestamp", "forecast_end_timestamp"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
// e.g. ".000Z"
const UTC_SUFFIX_LEN: usize = 5;
const SAST_OFFSET_HOURS: i64 = 2;
const SAST_SUFFIX: &str = "+02:00";

#[derive(Debug, Error)]
#[error("cannot convert {field} value {value} to SAST")]
pub struct TimestampError {
    pub field: String,
    pub value: String,
}

pub fn sanitize_alert(alert: &mut Alert) -> Result<(), TimestampError> {
    for field in REMOVED_FIELDS {
        alert.remove(*field);
    }

    alert.retain(|_, v| !v.is_null());

    for field in TIMESTAMP_FIELDS {
        if let Some(value) = alert.get_mut(*field) {
            let converted = value
                .as_str()
                .and_then(convert_to_sast)
                .ok_or_else(|| TimestampError {
                    field: (*field).to_owned(),
                    value: value.to_string(),
                })?;
            *value = Value::String(converted);
        }
    }

    Ok(())
}

/// SAST is a fixed UTC+2 offset with no daylight saving, so the shift is plain arithmetic.
pub fn convert_to_sast(utc: &str) -> Option<String> {
    let trimmed = utc.get(..utc.len().checked_sub(UTC_SUFFIX_LEN)?)?;
    let parsed = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT).ok()?;

    Some(format!(
        "{}{}",
        (parsed + Duration::hours(SAST_OFFSET_HOURS)).format(TIMESTAMP_FORMAT),
        SAST_SUFFIX
    ))
}
