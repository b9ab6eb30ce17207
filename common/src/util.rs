use std::ops::{Bound, RangeBounds};

use bytes::Bytes;

/// An owned byte-key range usable with ordered storage scans.
///
/// Standard library ranges over `Bytes` are awkward to pass across trait
/// object boundaries, so scans take this concrete type instead. It implements
/// [`RangeBounds<Bytes>`] and can therefore be handed directly to backends
/// that accept standard ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesRange {
    pub start: Bound<Bytes>,
    pub end: Bound<Bytes>,
}

impl BytesRange {
    pub fn new(start: Bound<Bytes>, end: Bound<Bytes>) -> Self {
        Self { start, end }
    }

    /// The range covering every key.
    pub fn unbounded() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// The range covering exactly the keys that start with `prefix`.
    ///
    /// The upper bound is the shortest byte string strictly greater than
    /// every key with the prefix: the prefix with its last non-`0xFF` byte
    /// incremented and any trailing `0xFF` bytes dropped. A prefix of all
    /// `0xFF` bytes has no such successor and the range is unbounded above.
    pub fn prefix(prefix: Bytes) -> Self {
        let end = prefix_successor(&prefix);
        Self {
            start: Bound::Included(prefix),
            end,
        }
    }

    /// Returns true if `key` falls within this range.
    pub fn contains(&self, key: &[u8]) -> bool {
        let after_start = match &self.start {
            Bound::Included(s) => key >= s.as_ref(),
            Bound::Excluded(s) => key > s.as_ref(),
            Bound::Unbounded => true,
        };
        let before_end = match &self.end {
            Bound::Included(e) => key <= e.as_ref(),
            Bound::Excluded(e) => key < e.as_ref(),
            Bound::Unbounded => true,
        };
        after_start && before_end
    }
}

impl RangeBounds<Bytes> for BytesRange {
    fn start_bound(&self) -> Bound<&Bytes> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&Bytes> {
        self.end.as_ref()
    }
}

fn prefix_successor(prefix: &[u8]) -> Bound<Bytes> {
    for i in (0..prefix.len()).rev() {
        if prefix[i] != 0xFF {
            let mut end = prefix[..=i].to_vec();
            end[i] += 1;
            return Bound::Excluded(Bytes::from(end));
        }
    }
    Bound::Unbounded
}
