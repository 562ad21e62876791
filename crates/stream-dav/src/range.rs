//! HTTP `Range` header parsing for the `bytes` unit.
//!
//! Only the first range of a multi-range header is used. Callers treat
//! [`RangeError::InvalidRange`] as "serve the whole file".

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("invalid range")]
    InvalidRange,
}

/// An inclusive byte range (`start..=end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// The whole of a resource of `len` bytes. `len` must be non-zero.
    pub fn full(len: u64) -> Self {
        debug_assert!(len > 0);
        Self {
            start: 0,
            end: len - 1,
        }
    }

    /// Length of this range in bytes.
    pub fn len(self) -> u64 {
        // `end` is inclusive.
        self.end - self.start + 1
    }

    pub fn is_empty(self) -> bool {
        self.start > self.end
    }

    /// `Content-Range` value for a resource of `total` bytes.
    pub fn content_range(self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Parse `header` against a resource of `len` bytes.
pub fn parse_range(header: &str, len: u64) -> Result<ByteRange, RangeError> {
    let ranges = header
        .strip_prefix("bytes=")
        .ok_or(RangeError::InvalidRange)?;
    let first = ranges.split(',').next().unwrap_or("").trim();
    if first.is_empty() {
        return Err(RangeError::InvalidRange);
    }

    let (start, end) = first.split_once('-').ok_or(RangeError::InvalidRange)?;
    let (start, end) = (start.trim(), end.trim());

    // `-N`: the last N bytes.
    if start.is_empty() {
        let suffix_len = parse_u64(end)?;
        if suffix_len == 0 || len == 0 {
            return Err(RangeError::InvalidRange);
        }
        return Ok(ByteRange {
            start: len.saturating_sub(suffix_len),
            end: len - 1,
        });
    }

    let start = parse_u64(start)?;
    if start >= len {
        return Err(RangeError::InvalidRange);
    }

    if end.is_empty() {
        return Ok(ByteRange {
            start,
            end: len - 1,
        });
    }

    let end = parse_u64(end)?.min(len - 1);
    if end < start {
        return Err(RangeError::InvalidRange);
    }

    Ok(ByteRange { start, end })
}

fn parse_u64(s: &str) -> Result<u64, RangeError> {
    s.parse::<u64>().map_err(|_| RangeError::InvalidRange)
}
