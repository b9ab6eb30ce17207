#![allow(dead_code)]

//! Serde for stats storage keys.
//!
//! # Key Format
//!
//! All keys start with a version byte and a record type discriminator:
//!
//! ```text
//! | version (u8) | type (u8) | ts (fixed-width RFC 3339 ASCII) | ... |
//! ```
//!
//! # Record Types
//!
//! - `Raw` (0x01): one collector submission, qualified by its content
//!   fingerprint: `| prefix | 0x00 | fingerprint hex |`
//! - `Materialized` (0x02): the single merged record for a bucket, keyed by
//!   timestamp alone.
//!
//! # Ordering
//!
//! Canonical timestamps are fixed-width ASCII, so byte order on keys equals
//! chronological order on buckets within each record type. Raw keys place a
//! `0x00` separator between the timestamp and the fingerprint; the `0xFF`
//! sentinel is greater than any byte that can appear in a key body. For any
//! fingerprint `f`:
//!
//! ```text
//! prefix(ts) < prefix(ts) + 0x00 + f < prefix(ts) + 0xFF
//! ```
//!
//! so scanning `[prefix + 0x00, prefix + 0xFF)` visits exactly one bucket's
//! submissions, in fingerprint order. Timestamps must already be in
//! canonical form; the [`Timestamp`](crate::Timestamp) type is the only path
//! into this codec.

use bytes::{BufMut, Bytes, BytesMut};
use common::BytesRange;
use std::ops::Bound;

use crate::error::Error;
use crate::fingerprint::FINGERPRINT_LEN;
use crate::time::Timestamp;

/// Key format version (currently 0x01)
pub(crate) const KEY_VERSION: u8 = 0x01;

/// Separates the timestamp from the fingerprint in raw keys.
pub(crate) const FIELD_SEP: u8 = 0x00;

/// Upper scan bound for a bucket prefix; never a legal key-body byte.
pub(crate) const FIELD_SENTINEL: u8 = 0xFF;

/// Width of a canonical timestamp (`YYYY-MM-DDTHH:MM:SSZ`).
const TS_LEN: usize = 20;

/// Record type discriminators for stats storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordType {
    /// Raw submission record, content-addressed within its bucket
    Raw = 0x01,
    /// Materialized aggregate record, one per bucket
    Materialized = 0x02,
}

impl RecordType {
    pub(crate) fn id(&self) -> u8 {
        *self as u8
    }

    pub(crate) fn from_id(id: u8) -> Result<Self, Error> {
        match id {
            0x01 => Ok(RecordType::Raw),
            0x02 => Ok(RecordType::Materialized),
            _ => Err(Error::Encoding(format!("invalid record type: 0x{:02x}", id))),
        }
    }
}

fn check_prefix(buf: &[u8], expected: RecordType) -> Result<(), Error> {
    if buf.len() < 2 {
        return Err(Error::Encoding("key too short for prefix".to_string()));
    }
    if buf[0] != KEY_VERSION {
        return Err(Error::Encoding(format!(
            "invalid key version: expected 0x{:02x}, got 0x{:02x}",
            KEY_VERSION, buf[0]
        )));
    }
    let record_type = RecordType::from_id(buf[1])?;
    if record_type != expected {
        return Err(Error::Encoding(format!(
            "invalid record type: expected {:?}, got {:?}",
            expected, record_type
        )));
    }
    Ok(())
}

fn bucket_prefix(record_type: RecordType, ts: &Timestamp) -> BytesMut {
    let mut buf = BytesMut::with_capacity(2 + TS_LEN + 1 + FINGERPRINT_LEN);
    buf.put_u8(KEY_VERSION);
    buf.put_u8(record_type.id());
    buf.put_slice(ts.as_bytes());
    buf
}

/// Key for a raw submission record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawKey {
    /// Bucket timestamp in canonical form
    pub ts: String,
    /// Content fingerprint of the submission
    pub fingerprint: String,
}

impl RawKey {
    pub(crate) fn new(ts: &Timestamp, fingerprint: impl Into<String>) -> Self {
        Self {
            ts: ts.as_str().to_string(),
            fingerprint: fingerprint.into(),
        }
    }

    pub(crate) fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + TS_LEN + 1 + FINGERPRINT_LEN);
        buf.put_u8(KEY_VERSION);
        buf.put_u8(RecordType::Raw.id());
        buf.put_slice(self.ts.as_bytes());
        buf.put_u8(FIELD_SEP);
        buf.put_slice(self.fingerprint.as_bytes());
        buf.freeze()
    }

    pub(crate) fn deserialize(buf: &[u8]) -> Result<Self, Error> {
        check_prefix(buf, RecordType::Raw)?;
        if buf.len() != 2 + TS_LEN + 1 + FINGERPRINT_LEN {
            return Err(Error::Encoding(format!(
                "raw key has unexpected length {}",
                buf.len()
            )));
        }
        if buf[2 + TS_LEN] != FIELD_SEP {
            return Err(Error::Encoding("raw key missing field separator".to_string()));
        }
        let ts = std::str::from_utf8(&buf[2..2 + TS_LEN])
            .map_err(|e| Error::Encoding(format!("raw key timestamp not utf-8: {}", e)))?;
        let fingerprint = std::str::from_utf8(&buf[2 + TS_LEN + 1..])
            .map_err(|e| Error::Encoding(format!("raw key fingerprint not utf-8: {}", e)))?;
        Ok(Self {
            ts: ts.to_string(),
            fingerprint: fingerprint.to_string(),
        })
    }

    /// The scan range covering every raw submission in one bucket.
    pub(crate) fn bucket_range(ts: &Timestamp) -> BytesRange {
        let prefix = bucket_prefix(RecordType::Raw, ts);

        let mut start = prefix.clone();
        start.put_u8(FIELD_SEP);

        let mut end = prefix;
        end.put_u8(FIELD_SENTINEL);

        BytesRange::new(Bound::Included(start.freeze()), Bound::Excluded(end.freeze()))
    }
}

/// Key for a materialized aggregate record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MaterializedKey {
    /// Bucket timestamp in canonical form
    pub ts: String,
}

impl MaterializedKey {
    pub(crate) fn new(ts: &Timestamp) -> Self {
        Self {
            ts: ts.as_str().to_string(),
        }
    }

    pub(crate) fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + TS_LEN);
        buf.put_u8(KEY_VERSION);
        buf.put_u8(RecordType::Materialized.id());
        buf.put_slice(self.ts.as_bytes());
        buf.freeze()
    }

    pub(crate) fn deserialize(buf: &[u8]) -> Result<Self, Error> {
        check_prefix(buf, RecordType::Materialized)?;
        if buf.len() != 2 + TS_LEN {
            return Err(Error::Encoding(format!(
                "materialized key has unexpected length {}",
                buf.len()
            )));
        }
        let ts = std::str::from_utf8(&buf[2..])
            .map_err(|e| Error::Encoding(format!("materialized key timestamp not utf-8: {}", e)))?;
        Ok(Self { ts: ts.to_string() })
    }

    /// The scan range covering materialized records in `[from, to)`.
    pub(crate) fn scan_range(from: &Timestamp, to: &Timestamp) -> BytesRange {
        BytesRange::new(
            Bound::Included(MaterializedKey::new(from).serialize()),
            Bound::Excluded(MaterializedKey::new(to).serialize()),
        )
    }
}
