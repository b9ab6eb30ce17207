//! Bucket timestamp normalization.
//!
//! # Convention
//!
//! Public APIs accept anything implementing [`IntoTimestamp`] — a canonical
//! string, any RFC 3339 string, a `chrono` datetime, or a `SystemTime`.
//! Internal code works only with [`Timestamp`], whose canonical fixed-width
//! UTC form (`YYYY-MM-DDTHH:MM:SSZ`) guarantees that byte order on encoded
//! keys equals chronological order on buckets.
//!
//! Conversion happens at the public API boundary, before any I/O, so an
//! unrecognized time representation fails fast as [`Error::InvalidInput`].

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

/// A bucket timestamp in canonical form.
///
/// Whole-second granularity: fractional seconds in the input are truncated
/// during normalization, and all offsets are rewritten to UTC. Two inputs
/// naming the same instant always produce the same canonical string, and
/// therefore the same storage keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(String);

impl Timestamp {
    /// Parses and normalizes an RFC 3339 timestamp.
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_rfc3339(input)
            .map_err(|e| Error::InvalidInput(format!("unrecognized timestamp '{}': {}", input, e)))?;
        Ok(Self::from_datetime(parsed.with_timezone(&Utc)))
    }

    fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

/// Conversion into a canonical [`Timestamp`], applied at the API boundary.
pub trait IntoTimestamp {
    fn into_timestamp(self) -> Result<Timestamp>;
}

impl IntoTimestamp for Timestamp {
    fn into_timestamp(self) -> Result<Timestamp> {
        Ok(self)
    }
}

impl IntoTimestamp for &Timestamp {
    fn into_timestamp(self) -> Result<Timestamp> {
        Ok(self.clone())
    }
}

impl IntoTimestamp for &str {
    fn into_timestamp(self) -> Result<Timestamp> {
        Timestamp::parse(self)
    }
}

impl IntoTimestamp for &String {
    fn into_timestamp(self) -> Result<Timestamp> {
        Timestamp::parse(self)
    }
}

impl IntoTimestamp for String {
    fn into_timestamp(self) -> Result<Timestamp> {
        Timestamp::parse(&self)
    }
}

impl IntoTimestamp for DateTime<Utc> {
    fn into_timestamp(self) -> Result<Timestamp> {
        Ok(self.into())
    }
}

impl IntoTimestamp for SystemTime {
    fn into_timestamp(self) -> Result<Timestamp> {
        Ok(DateTime::<Utc>::from(self).into())
    }
}
