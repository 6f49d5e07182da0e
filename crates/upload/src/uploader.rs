//! Per-file upload driver.
//!
//! `ChunkedUploader` owns the sequencing: it slices the file, sends one
//! request at a time, adopts the server's offsets, feeds acknowledged bytes
//! to the hash accumulator and finishes with the completion handshake.

use std::io::{Read, Seek};

use labdrop_protocol::constants::effective_chunk_size;
use labdrop_protocol::{BindingParams, ChunkAck, CompletionResponse, UploadResource};
use labdrop_transfer::{
    ChunkRange, ChunkReader, HashAccumulator, ProgressReporter, UploadSession, UploadStatus,
    checksum_bytes, validate_filename,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::UploadError;
use crate::transport::{
    ChunkRequest, CompletionRequest, SessionRef, UploadTransport, WholeFileRequest,
};
use crate::types::{ResumePoint, UploadEvent, UploadOutcome, UploadRequest};

/// Uploads files over one transport.
///
/// Every call owns its session, accumulator and reporter, so concurrent
/// uploads share nothing but the transport and the cancellation token.
pub struct ChunkedUploader<'a> {
    conn: &'a dyn UploadTransport,
    cancel: CancellationToken,
}

impl<'a> ChunkedUploader<'a> {
    pub fn new(conn: &'a dyn UploadTransport, cancel: CancellationToken) -> Self {
        Self { conn, cancel }
    }

    /// Uploads a file from its first byte.
    ///
    /// Files no larger than one chunk go out in a single request. Larger
    /// files open a session, send every chunk in order, then complete it.
    ///
    /// Events: `Started`, one `Progress` per acknowledged chunk, then exactly
    /// one of `Completed`, `Failed` or `Cancelled`. Sending never blocks the
    /// upload; start and progress events are dropped while the channel is full.
    pub async fn upload<R>(
        &self,
        reader: ChunkReader<R>,
        request: &UploadRequest,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        let result = self.start_upload(reader, request, events_tx).await;
        self.emit_result(events_tx, &request.filename, &result);
        result
    }

    /// Continues an existing session after asking the server for its offset.
    ///
    /// The acknowledged prefix is rehashed locally and never resent. A
    /// resumed upload never takes the fast path.
    pub async fn resume<R>(
        &self,
        reader: ChunkReader<R>,
        request: &UploadRequest,
        session_id: &str,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        let result: Result<UploadOutcome, UploadError> = async {
            let ack = self.session_status(&request.resource, session_id).await?;
            let point = ResumePoint {
                session_id: ack.session_id().unwrap_or_else(|| session_id.to_string()),
                offset: ack.offset,
            };
            self.start_resume(reader, request, point, events_tx).await
        }
        .await;
        self.emit_result(events_tx, &request.filename, &result);
        result
    }

    /// Continues an existing session from a caller-known offset.
    pub async fn resume_from<R>(
        &self,
        reader: ChunkReader<R>,
        request: &UploadRequest,
        point: ResumePoint,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        let result = self.start_resume(reader, request, point, events_tx).await;
        self.emit_result(events_tx, &request.filename, &result);
        result
    }

    /// Sends the whole file in one request together with its digest.
    ///
    /// No session is opened and no progress is reported.
    pub async fn upload_small<R>(
        &self,
        reader: ChunkReader<R>,
        request: &UploadRequest,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        self.check_cancelled()?;

        let size = reader.size();
        let (_, data) = read_range(reader, 0, size).await?;
        let sha256 = checksum_bytes(&data);

        debug!(file = %request.filename, bytes = size, "sending whole file");
        let req = WholeFileRequest {
            resource: request.resource.clone(),
            filename: request.filename.clone(),
            data,
            sha256: sha256.clone(),
            binding: request.binding.clone(),
        };

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            result = self.conn.upload_whole(req) => result?,
        };

        info!(file = %request.filename, sha256 = %sha256, "upload completed");
        Ok(UploadOutcome {
            filename: request.filename.clone(),
            sha256,
            session_id: None,
            chunks_sent: 1,
            fast_path: true,
            response,
        })
    }

    /// Sends the final digest and binding metadata for a fully
    /// acknowledged session.
    ///
    /// Not raced against cancellation.
    pub async fn complete(
        &self,
        resource: &UploadResource,
        session_id: &str,
        sha256: &str,
        binding: &BindingParams,
    ) -> Result<CompletionResponse, UploadError> {
        debug!(session = %session_id, sha256 = %sha256, "completing upload");
        self.conn
            .complete(CompletionRequest {
                resource: resource.clone(),
                session_id: session_id.to_string(),
                sha256: sha256.to_string(),
                binding: binding.clone(),
            })
            .await
    }

    /// Returns the server's view of a session.
    pub async fn session_status(
        &self,
        resource: &UploadResource,
        session_id: &str,
    ) -> Result<ChunkAck, UploadError> {
        let session = SessionRef {
            resource: resource.clone(),
            session_id: session_id.to_string(),
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            result = self.conn.session_status(session) => result,
        }
    }

    /// Deletes a server-side session.
    pub async fn cancel_session(
        &self,
        resource: &UploadResource,
        session_id: &str,
    ) -> Result<(), UploadError> {
        debug!(session = %session_id, "deleting session");
        self.conn
            .cancel_session(SessionRef {
                resource: resource.clone(),
                session_id: session_id.to_string(),
            })
            .await
    }

    async fn start_upload<R>(
        &self,
        reader: ChunkReader<R>,
        request: &UploadRequest,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        validate_filename(&request.filename)?;

        let total = reader.size();
        let chunk_size = effective_chunk_size(request.chunk_size);
        let fast_path = total <= chunk_size;

        self.emit(
            events_tx,
            UploadEvent::Started {
                label: request.filename.clone(),
                total_bytes: total,
                fast_path,
                resumed_from: None,
            },
        );

        if fast_path {
            return self.upload_small(reader, request).await;
        }

        let session = UploadSession::new(&request.filename, total, chunk_size);
        self.run_session(reader, request, session, HashAccumulator::new(), events_tx)
            .await
    }

    async fn start_resume<R>(
        &self,
        reader: ChunkReader<R>,
        request: &UploadRequest,
        point: ResumePoint,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        validate_filename(&request.filename)?;

        let total = reader.size();
        let chunk_size = effective_chunk_size(request.chunk_size);
        let session = UploadSession::resumed(
            &request.filename,
            total,
            chunk_size,
            point.session_id.clone(),
            point.offset,
        )?;

        self.emit(
            events_tx,
            UploadEvent::Started {
                label: request.filename.clone(),
                total_bytes: total,
                fast_path: false,
                resumed_from: Some(point.offset),
            },
        );

        debug!(session = %point.session_id, offset = point.offset, "resuming session");
        let (reader, hasher) = rehash_prefix(reader, point.offset, chunk_size).await?;
        self.run_session(reader, request, session, hasher, events_tx)
            .await
    }

    /// Runs the chunk loop and settles the session state on the way out.
    async fn run_session<R>(
        &self,
        reader: ChunkReader<R>,
        request: &UploadRequest,
        mut session: UploadSession,
        hasher: HashAccumulator,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        let result = self
            .send_chunks(reader, request, &mut session, hasher, events_tx)
            .await;

        match &result {
            Ok(_) => {}
            Err(UploadError::Cancelled) => self.abort_session(&mut session, &request.resource).await,
            Err(e) => {
                session.fail(&e.to_string());
                if let Some(id) = session.session_id() {
                    info!(
                        session = %id,
                        offset = session.offset(),
                        "upload stopped; session can be resumed"
                    );
                }
            }
        }

        debug!(
            file = %request.filename,
            status = %session.status(),
            offset = session.offset(),
            "session finished"
        );
        result
    }

    async fn send_chunks<R>(
        &self,
        mut reader: ChunkReader<R>,
        request: &UploadRequest,
        session: &mut UploadSession,
        mut hasher: HashAccumulator,
        events_tx: &mpsc::Sender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        let total = session.total_size();
        let mut progress = ProgressReporter::starting_at(total, session.offset());
        let mut chunks_sent: u64 = 0;

        while let Some(range) = session.next_range() {
            self.check_cancelled()?;

            let first = session.session_id().is_none();
            if first && chunks_sent > 0 {
                return Err(UploadError::MissingSessionId);
            }

            let (r, data) = read_range(reader, range.start, range.byte_len()).await?;
            reader = r;

            session.begin_chunk()?;
            let req = ChunkRequest {
                resource: request.resource.clone(),
                session_id: session.session_id().map(str::to_string),
                filename: request.filename.clone(),
                range: range.content_range(total),
                data: data.clone(),
                binding: first.then(|| request.binding.clone()),
            };
            debug!(file = %request.filename, range = %req.range, "sending chunk");

            let ack = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                result = self.conn.send_chunk(req) => result?,
            };
            chunks_sent += 1;

            let acked = ack.offset;
            if acked <= range.start || acked > range.end + 1 {
                return Err(UploadError::Protocol(format!(
                    "server acknowledged offset {acked} for {}",
                    range.content_range(total)
                )));
            }

            hasher.update(range.start, &data[..(acked - range.start) as usize])?;
            session.acknowledge(ack.session_id(), acked)?;
            debug!(session = ?session.session_id(), offset = acked, "chunk acknowledged");

            let percent = progress.report(acked);
            self.emit_progress(events_tx, &request.filename, percent, acked, total);
        }

        if session.status() == UploadStatus::NotStarted {
            // Resumed with every byte already on the server.
            session.begin_finalizing()?;
            let percent = progress.report(total);
            self.emit_progress(events_tx, &request.filename, percent, total, total);
        }

        let Some(session_id) = session.session_id().map(str::to_string) else {
            return Err(UploadError::MissingSessionId);
        };
        let sha256 = hasher.finalize();
        let response = self
            .complete(&request.resource, &session_id, &sha256, &request.binding)
            .await?;
        session.complete()?;

        info!(
            file = %request.filename,
            session = %session_id,
            sha256 = %sha256,
            chunks = chunks_sent,
            "upload completed"
        );

        Ok(UploadOutcome {
            filename: request.filename.clone(),
            sha256,
            session_id: Some(session_id),
            chunks_sent,
            fast_path: false,
            response,
        })
    }

    /// Marks the session cancelled and deletes it on the server if it exists.
    ///
    /// A failed delete is logged; the upload still reports `Cancelled`.
    async fn abort_session(&self, session: &mut UploadSession, resource: &UploadResource) {
        if let Err(e) = session.cancel() {
            warn!(error = %e, "session not cancellable");
            return;
        }
        let Some(session_id) = session.session_id() else {
            return;
        };

        match self.cancel_session(resource, session_id).await {
            Ok(()) => debug!(session = %session_id, "cancelled session deleted"),
            Err(e) => warn!(session = %session_id, error = %e, "failed to delete cancelled session"),
        }
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn emit_progress(
        &self,
        events_tx: &mpsc::Sender<UploadEvent>,
        label: &str,
        percent: f64,
        offset: u64,
        total: u64,
    ) {
        self.emit(
            events_tx,
            UploadEvent::Progress {
                label: label.to_string(),
                percent,
                offset,
                total,
            },
        );
    }

    /// Emits the terminal event without blocking the upload.
    ///
    /// When the channel is full the event is handed to a task that waits
    /// for room, so a lagging consumer still sees how every upload ended.
    fn emit_result(
        &self,
        events_tx: &mpsc::Sender<UploadEvent>,
        label: &str,
        result: &Result<UploadOutcome, UploadError>,
    ) {
        let label = label.to_string();
        let event = match result {
            Ok(outcome) => UploadEvent::Completed {
                label,
                sha256: outcome.sha256.clone(),
                resource_id: outcome.response.id.clone(),
            },
            Err(UploadError::Cancelled) => UploadEvent::Cancelled { label },
            Err(e) => UploadEvent::Failed {
                label,
                error: e.to_string(),
            },
        };

        if let Err(TrySendError::Full(event)) = events_tx.try_send(event) {
            let tx = events_tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(event).await;
            });
        }
    }

    /// Start and progress events are advisory: dropped while the consumer lags.
    fn emit(&self, events_tx: &mpsc::Sender<UploadEvent>, event: UploadEvent) {
        if let Err(TrySendError::Full(event)) = events_tx.try_send(event) {
            trace!(?event, "event channel full, dropping event");
        }
    }
}

/// Reads `len` bytes at `offset` on the blocking pool, handing the reader back.
async fn read_range<R>(
    reader: ChunkReader<R>,
    offset: u64,
    len: u64,
) -> Result<(ChunkReader<R>, Vec<u8>), UploadError>
where
    R: Read + Seek + Send + 'static,
{
    let (reader, data) = tokio::task::spawn_blocking(move || {
        let mut reader = reader;
        let data = reader.read_at(offset, len);
        (reader, data)
    })
    .await
    .map_err(|e| UploadError::Task(e.to_string()))?;
    Ok((reader, data?))
}

/// Hashes `[0, len)` without sending it.
async fn rehash_prefix<R>(
    mut reader: ChunkReader<R>,
    len: u64,
    chunk_size: u64,
) -> Result<(ChunkReader<R>, HashAccumulator), UploadError>
where
    R: Read + Seek + Send + 'static,
{
    let mut hasher = HashAccumulator::new();
    for range in ChunkRange::plan(len, chunk_size) {
        let (r, data) = read_range(reader, range.start, range.byte_len()).await?;
        reader = r;
        hasher.update(range.start, &data)?;
    }
    Ok((reader, hasher))
}
