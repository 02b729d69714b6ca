//! Value ordering, numeric normalisation and date handling for stored documents
//!
//! Documents are plain JSON objects. Dates are stored as UTC strings in a
//! fixed-width layout so that lexicographic and chronological order agree.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Date layouts accepted when casting caller input, tried in order after RFC 3339
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d,%H:%M:%S",
    "%Y-%m-%d,%H:%M",
];

/// Format a timestamp the way the store persists it
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use tour_service::store::format_date;
///
/// let date = Utc.with_ymd_and_hms(2021, 3, 20, 10, 0, 0).unwrap();
/// assert_eq!(format_date(&date), "2021-03-20T10:00:00.000Z");
/// ```
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a caller supplied date string
///
/// Accepts RFC 3339, naive date-times (interpreted as UTC) and plain dates
/// (midnight UTC). Returns `None` for anything else.
#[must_use]
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Convert an `f64` into a JSON number, keeping integral values integral
#[must_use]
pub fn number_to_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::Number((n as i64).into())
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Rank of a JSON type in the cross-type ordering
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values
///
/// Values of different types order by type rank
/// (null < number < string < object < array < boolean).
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ordering = compare_values(left, right);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            Value::Object(x.clone()).to_string().cmp(&Value::Object(y.clone()).to_string())
        }
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Equality that treats `5` and `5.0` as the same value
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    type_rank(a) == type_rank(b) && compare_values(a, b) == Ordering::Equal
}

/// Whether two values may be range-compared (same type bracket)
#[must_use]
pub fn comparable(a: &Value, b: &Value) -> bool {
    type_rank(a) == type_rank(b) && !a.is_null()
}
