//! Building blocks for resumable chunked uploads.
//!
//! Everything here is synchronous and transport-free: byte-range math, the
//! ordered SHA-256 accumulator, the per-upload session state machine and the
//! progress reporter. The network loop lives in `labdrop-upload`.

mod chunked;
mod hash;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkReader, calculate_file_checksum, checksum_bytes};
pub use hash::HashAccumulator;
pub use labdrop_protocol::DEFAULT_CHUNK_SIZE;
pub use labdrop_protocol::UploadStatus;
pub use progress::ProgressReporter;
pub use types::{ChunkRange, UploadSession, chunk_count};
pub use validation::{upload_filename, validate_filename};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hash update out of order: expected offset {expected}, got {got}")]
    HashOutOfOrder { expected: u64, got: u64 },

    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: UploadStatus,
        to: UploadStatus,
    },

    #[error("acknowledged offset {got} is behind current offset {current}")]
    OffsetRegressed { current: u64, got: u64 },

    #[error("offset {offset} exceeds file size {total}")]
    OffsetOutOfBounds { offset: u64, total: u64 },

    #[error("byte range {start}..{end} outside file of {total} bytes")]
    RangeOutOfBounds { start: u64, end: u64, total: u64 },

    #[error("invalid filename: {0}")]
    InvalidFilename(String),
}
