use sha2::{Digest, Sha256};

use crate::TransferError;

/// Incremental SHA-256 over a whole file, fed one byte range at a time.
///
/// Ranges must arrive in file order with no gaps or overlaps; `update`
/// rejects anything else. `finalize` consumes the accumulator, so a digest
/// is produced at most once.
pub struct HashAccumulator {
    hasher: Sha256,
    next_offset: u64,
}

impl Default for HashAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl HashAccumulator {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            next_offset: 0,
        }
    }

    /// Feeds `data`, which must start at file offset `offset`.
    pub fn update(&mut self, offset: u64, data: &[u8]) -> Result<(), TransferError> {
        if offset != self.next_offset {
            return Err(TransferError::HashOutOfOrder {
                expected: self.next_offset,
                got: offset,
            });
        }
        self.hasher.update(data);
        self.next_offset += data.len() as u64;
        Ok(())
    }

    /// Offset the next `update` must start at (= bytes hashed so far).
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Returns the lowercase hex digest of everything fed so far.
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}
