//! serde helper for `DateTime<Utc>` fields, driven by [`DateStrategy`].
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Event {
//!     #[serde(with = "rtdb_rx::codec::date")]
//!     at: DateTime<Utc>,
//! }
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

use super::context;
use super::strategy::DateStrategy;

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Int(i64),
    Float(f64),
    Text(String),
}

#[allow(clippy::cast_precision_loss)]
fn seconds_since_epoch(value: &DateTime<Utc>) -> f64 {
    value.timestamp() as f64 + f64::from(value.timestamp_subsec_nanos()) / 1e9
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

fn parse_formatted(text: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(text, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serialize a timestamp with the active date strategy.
///
/// # Errors
/// Fails if the active format string cannot render the timestamp.
pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    let strategy = context::with_active(|c| c.date.clone());
    match strategy {
        DateStrategy::Rfc3339 => {
            serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        DateStrategy::SecondsSince1970 => serializer.serialize_f64(seconds_since_epoch(value)),
        DateStrategy::MillisecondsSince1970 => serializer.serialize_i64(value.timestamp_millis()),
        DateStrategy::Formatted(format) => {
            use std::fmt::Write as _;
            let mut out = String::new();
            write!(out, "{}", value.format(&format))
                .map_err(|_| S::Error::custom(format!("invalid date format '{format}'")))?;
            serializer.serialize_str(&out)
        }
    }
}

/// Deserialize a timestamp stored with the active date strategy.
///
/// # Errors
/// Fails if the stored value does not match the active strategy.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let stored = Stored::deserialize(deserializer)?;
    let strategy = context::with_active(|c| c.date.clone());
    #[allow(clippy::cast_precision_loss)]
    let parsed = match (&strategy, stored) {
        (DateStrategy::Rfc3339, Stored::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        (DateStrategy::SecondsSince1970, Stored::Int(secs)) => from_seconds(secs as f64),
        (DateStrategy::SecondsSince1970, Stored::Float(secs)) => from_seconds(secs),
        (DateStrategy::MillisecondsSince1970, Stored::Int(millis)) => {
            DateTime::from_timestamp_millis(millis)
        }
        (DateStrategy::MillisecondsSince1970, Stored::Float(millis)) => {
            from_seconds(millis / 1000.0)
        }
        (DateStrategy::Formatted(format), Stored::Text(text)) => parse_formatted(&text, format),
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("date does not match {strategy:?} strategy")))
}
