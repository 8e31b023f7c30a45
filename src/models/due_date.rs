use std::{fmt, str::FromStr};

use jiff::{
    Span, Timestamp,
    civil::{Date, DateTime},
    tz::TimeZone,
};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};
use thiserror::Error;

/// When a todo is due.
///
/// Persisted data carries due dates in whatever shape the writer produced:
/// a full instant (`2024-05-03T10:00:00.000Z`), a wall-clock date-time with
/// no offset (`2024-05-03T14:30`), or a bare date (`2024-05-03`). Each shape
/// is kept as-is so that writing a todo back does not change its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDate {
    Instant(Timestamp),
    DateTime(DateTime),
    Date(Date),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid due date '{input}': {reason}")]
pub struct InvalidDueDate {
    pub input: String,
    pub reason: String,
}

impl DueDate {
    /// A due date `days` whole days after `now`.
    pub fn days_after(now: Timestamp, days: i64) -> Result<DueDate, jiff::Error> {
        // A saturated hour count is outside Span's range and rejected there.
        let span = Span::new().try_hours(days.saturating_mul(24))?;
        now.checked_add(span).map(DueDate::Instant)
    }

    pub fn from_epoch_millis(millis: i64) -> Result<DueDate, jiff::Error> {
        Timestamp::from_millisecond(millis).map(DueDate::Instant)
    }

    /// Resolves the due date to an instant. Civil values are interpreted in
    /// `tz`; a bare date means the start of that day.
    pub fn to_timestamp(&self, tz: &TimeZone) -> Result<Timestamp, jiff::Error> {
        match self {
            DueDate::Instant(timestamp) => Ok(*timestamp),
            DueDate::DateTime(datetime) => Ok(datetime.to_zoned(tz.clone())?.timestamp()),
            DueDate::Date(date) => Ok(date.to_zoned(tz.clone())?.timestamp()),
        }
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDate::Instant(timestamp) => write!(f, "{}", timestamp),
            DueDate::DateTime(datetime) => write!(f, "{}", datetime),
            DueDate::Date(date) => write!(f, "{}", date),
        }
    }
}

impl FromStr for DueDate {
    type Err = InvalidDueDate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = |e: jiff::Error| InvalidDueDate {
            input: s.to_string(),
            reason: e.to_string(),
        };

        if let Ok(timestamp) = input.parse::<Timestamp>() {
            return Ok(DueDate::Instant(timestamp));
        }

        if input.contains(['T', 't', ' ']) {
            input
                .parse::<DateTime>()
                .map(DueDate::DateTime)
                .map_err(invalid)
        } else {
            input.parse::<Date>().map(DueDate::Date).map_err(invalid)
        }
    }
}

impl Serialize for DueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DueDateVisitor)
    }
}

struct DueDateVisitor;

impl Visitor<'_> for DueDateVisitor {
    type Value = DueDate;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a date string or epoch milliseconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<DueDate, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<DueDate, E> {
        DueDate::from_epoch_millis(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<DueDate, E> {
        let millis = i64::try_from(v).map_err(E::custom)?;
        self.visit_i64(millis)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<DueDate, E> {
        if !v.is_finite() {
            return Err(E::custom("due date timestamp is not a finite number"));
        }
        self.visit_i64(v.trunc() as i64)
    }
}
