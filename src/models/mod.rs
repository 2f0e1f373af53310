//! Data models

pub mod application;
pub mod log;
pub mod review;
pub mod task;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-width UTC text layout used in every timestamp column.
///
/// Lexicographic order of this layout equals chronological order, and
/// SQLite's `DATE()` / `strftime()` understand it.
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Utc::now())
    }

    pub fn to_db(&self) -> String {
        to_db_timestamp(self.0)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp(dt)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = chrono::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NaiveDateTime::parse_from_str(&value, DB_TIMESTAMP_FORMAT).map(|n| Timestamp(n.and_utc()))
    }
}

/// ISO 8601 input: RFC 3339, a datetime without offset (read as UTC), or a
/// bare date (midnight UTC)
pub fn parse_iso_timestamp(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Timestamp(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Timestamp(naive.and_utc()));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Timestamp(naive.and_utc()))
}

pub(crate) fn deserialize_iso_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_iso_timestamp(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("{:?} is not an ISO 8601 date", text)))
}

pub fn to_db_timestamp(dt: DateTime<Utc>) -> String {
    dt.format(DB_TIMESTAMP_FORMAT).to_string()
}
