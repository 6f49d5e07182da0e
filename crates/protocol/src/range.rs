//! `Content-Range` header values for chunk requests.

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// An inclusive byte range within a file of known size.
///
/// Renders as `bytes {start}-{end}/{total}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ContentRange {
    /// Creates a range, checking `start <= end < total`.
    pub fn new(start: u64, end: u64, total: u64) -> Result<Self, ProtocolError> {
        if start > end || end >= total {
            return Err(ProtocolError::InvalidContentRange(format!(
                "bytes {start}-{end}/{total}"
            )));
        }
        Ok(Self { start, end, total })
    }

    /// Number of bytes covered by the range.
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Offset of the first byte after the range.
    pub fn next_offset(&self) -> u64 {
        self.end + 1
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

impl FromStr for ContentRange {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidContentRange(s.to_string());

        let spec = s.trim().strip_prefix("bytes ").ok_or_else(invalid)?;
        let (range, total) = spec.split_once('/').ok_or_else(invalid)?;
        let (start, end) = range.split_once('-').ok_or_else(invalid)?;

        let start: u64 = start.trim().parse().map_err(|_| invalid())?;
        let end: u64 = end.trim().parse().map_err(|_| invalid())?;
        let total: u64 = total.trim().parse().map_err(|_| invalid())?;

        Self::new(start, end, total).map_err(|_| invalid())
    }
}
