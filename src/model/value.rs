//! Lenient conversions for loosely typed provider payloads.

use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::PlaceId;

const DATE_TIME_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const TIME_LAYOUTS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Deserializes an identifier sent either as a JSON number or a numeric string.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<PlaceId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected numeric identifier, found {value}")))
}

/// Reads an identifier out of a JSON number or numeric string.
pub fn id_from_value(value: &Value) -> Option<PlaceId> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as PlaceId)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Renders a scalar the way it should appear in a spreadsheet cell.
///
/// Integral floats lose their trailing `.0` and `null` becomes blank.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(int), _) => int.to_string(),
            (None, Some(float)) if float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{float:.0}")
            }
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}

/// Reduces a timestamp or clock string to `HH:MM`.
///
/// The provider's wall-clock time is kept as is, offsets are not converted.
/// Unrecognised input is returned trimmed but otherwise untouched.
pub fn clock_time(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return stamp.format("%H:%M").to_string();
    }
    for layout in DATE_TIME_LAYOUTS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, layout) {
            return stamp.format("%H:%M").to_string();
        }
    }
    for layout in TIME_LAYOUTS {
        if let Ok(time) = NaiveTime::parse_from_str(raw, layout) {
            return time.format("%H:%M").to_string();
        }
    }
    raw.to_string()
}
