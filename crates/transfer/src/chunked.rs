use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::TransferError;
use crate::types::ChunkRange;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file and returns the hex-encoded digest.
pub fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Random-access reader that slices exact byte ranges out of a file.
///
/// The size is captured once at construction; every range is checked
/// against it.
pub struct ChunkReader<R = std::fs::File> {
    source: R,
    size: u64,
}

impl ChunkReader<std::fs::File> {
    /// Opens `path` for range reads.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { source: file, size })
    }
}

impl ChunkReader<Cursor<Vec<u8>>> {
    /// Wraps an in-memory buffer.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self {
            source: Cursor::new(data),
            size,
        }
    }
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Wraps any seekable source of `size` bytes.
    pub fn new(source: R, size: u64) -> Self {
        Self { source, size }
    }

    /// Total size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads `len` bytes starting at `offset`.
    pub fn read_at(&mut self, offset: u64, len: u64) -> Result<Vec<u8>, TransferError> {
        let end = offset.checked_add(len).unwrap_or(u64::MAX);
        if end > self.size {
            return Err(TransferError::RangeOutOfBounds {
                start: offset,
                end,
                total: self.size,
            });
        }

        self.source.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads the bytes of one chunk.
    pub fn read_chunk(&mut self, range: &ChunkRange) -> Result<Vec<u8>, TransferError> {
        self.read_at(range.start, range.byte_len())
    }

    /// Reads the whole source.
    pub fn read_all(&mut self) -> Result<Vec<u8>, TransferError> {
        self.read_at(0, self.size)
    }
}
