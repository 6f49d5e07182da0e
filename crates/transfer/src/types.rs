use labdrop_protocol::{ContentRange, UploadStatus};

use crate::TransferError;

/// Number of chunks needed for `total` bytes (`ceil(total / chunk_size)`).
pub fn chunk_count(total: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    total.div_ceil(chunk_size)
}

/// One contiguous byte range of a file; `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Sequence number implied by `start / chunk_size`.
    pub index: u64,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    /// Range of chunk `index`, or `None` past the end of the file.
    pub fn for_index(index: u64, chunk_size: u64, total: u64) -> Option<Self> {
        let start = index.checked_mul(chunk_size)?;
        Self::starting_at(start, chunk_size, total)
    }

    /// Range of at most `chunk_size` bytes beginning at `offset`.
    ///
    /// Returns `None` when `offset >= total` or `chunk_size == 0`.
    pub fn starting_at(offset: u64, chunk_size: u64, total: u64) -> Option<Self> {
        if chunk_size == 0 || offset >= total {
            return None;
        }
        let end = offset.saturating_add(chunk_size).min(total) - 1;
        Some(Self {
            index: offset / chunk_size,
            start: offset,
            end,
        })
    }

    /// All chunk ranges of a file, in order.
    pub fn plan(total: u64, chunk_size: u64) -> impl Iterator<Item = ChunkRange> {
        (0..chunk_count(total, chunk_size))
            .filter_map(move |i| Self::for_index(i, chunk_size, total))
    }

    /// Number of bytes in the range.
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Header value for this range within a file of `total` bytes.
    pub fn content_range(&self, total: u64) -> ContentRange {
        ContentRange {
            start: self.start,
            end: self.end,
            total,
        }
    }
}

/// Client-side record of one chunked upload session.
///
/// Owned by a single upload task; the sequencer is the only writer, so no
/// locking is involved.
#[derive(Debug, Clone)]
pub struct UploadSession {
    session_id: Option<String>,
    filename: String,
    total_size: u64,
    chunk_size: u64,
    offset: u64,
    status: UploadStatus,
    error: Option<String>,
}

impl UploadSession {
    /// Creates a session that has not sent anything yet.
    pub fn new(filename: impl Into<String>, total_size: u64, chunk_size: u64) -> Self {
        Self {
            session_id: None,
            filename: filename.into(),
            total_size,
            chunk_size,
            offset: 0,
            status: UploadStatus::NotStarted,
            error: None,
        }
    }

    /// Creates a session continuing a server-side session at `offset`.
    pub fn resumed(
        filename: impl Into<String>,
        total_size: u64,
        chunk_size: u64,
        session_id: impl Into<String>,
        offset: u64,
    ) -> Result<Self, TransferError> {
        if offset > total_size {
            return Err(TransferError::OffsetOutOfBounds {
                offset,
                total: total_size,
            });
        }
        let mut session = Self::new(filename, total_size, chunk_size);
        session.session_id = Some(session_id.into());
        session.offset = offset;
        Ok(session)
    }

    /// Marks a chunk request as dispatched.
    pub fn begin_chunk(&mut self) -> Result<(), TransferError> {
        match self.status {
            UploadStatus::NotStarted | UploadStatus::ChunkInFlight => {
                self.status = UploadStatus::ChunkInFlight;
                Ok(())
            }
            from => Err(TransferError::InvalidTransition {
                from,
                to: UploadStatus::ChunkInFlight,
            }),
        }
    }

    /// Adopts the server's acknowledgement of the in-flight chunk.
    ///
    /// The session id is replaced only when the server sends one. Moves to
    /// `Finalizing` once every byte is acknowledged.
    pub fn acknowledge(
        &mut self,
        session_id: Option<String>,
        offset: u64,
    ) -> Result<(), TransferError> {
        if self.status != UploadStatus::ChunkInFlight {
            return Err(TransferError::InvalidTransition {
                from: self.status,
                to: UploadStatus::ChunkInFlight,
            });
        }
        if offset < self.offset {
            return Err(TransferError::OffsetRegressed {
                current: self.offset,
                got: offset,
            });
        }
        if offset > self.total_size {
            return Err(TransferError::OffsetOutOfBounds {
                offset,
                total: self.total_size,
            });
        }

        if session_id.is_some() {
            self.session_id = session_id;
        }
        self.offset = offset;
        if self.offset == self.total_size {
            self.status = UploadStatus::Finalizing;
        }
        Ok(())
    }

    /// Moves a resumed session that is already fully acknowledged straight
    /// to `Finalizing`.
    pub fn begin_finalizing(&mut self) -> Result<(), TransferError> {
        let ready = self.status == UploadStatus::NotStarted
            && self.session_id.is_some()
            && self.offset == self.total_size;
        if !ready {
            return Err(TransferError::InvalidTransition {
                from: self.status,
                to: UploadStatus::Finalizing,
            });
        }
        self.status = UploadStatus::Finalizing;
        Ok(())
    }

    /// Marks the completion handshake as successful.
    pub fn complete(&mut self) -> Result<(), TransferError> {
        if self.status != UploadStatus::Finalizing {
            return Err(TransferError::InvalidTransition {
                from: self.status,
                to: UploadStatus::Completed,
            });
        }
        self.status = UploadStatus::Completed;
        Ok(())
    }

    /// Marks the session as failed. A terminal session is left unchanged.
    pub fn fail(&mut self, err: &str) {
        if self.status.is_terminal() {
            return;
        }
        self.status = UploadStatus::Failed;
        self.error = Some(err.to_string());
    }

    /// Marks the session as cancelled.
    pub fn cancel(&mut self) -> Result<(), TransferError> {
        match self.status {
            UploadStatus::NotStarted | UploadStatus::ChunkInFlight => {
                self.status = UploadStatus::Cancelled;
                Ok(())
            }
            from => Err(TransferError::InvalidTransition {
                from,
                to: UploadStatus::Cancelled,
            }),
        }
    }

    /// Range of the next chunk to send, or `None` once every byte is acknowledged.
    pub fn next_range(&self) -> Option<ChunkRange> {
        ChunkRange::starting_at(self.offset, self.chunk_size, self.total_size)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns `true` while more chunks may be sent or cancellation is allowed.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            UploadStatus::NotStarted | UploadStatus::ChunkInFlight
        )
    }
}
