//! Scripted in-memory transport shared by the crate's tests.

use std::sync::Mutex;

use labdrop_protocol::{BindingParams, ChunkAck, CompletionResponse, ContentRange, ResourceId};
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;
use crate::transport::{
    ChunkRequest, CompletionRequest, SessionRef, TransportFuture, UploadTransport,
    WholeFileRequest,
};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Whole {
        filename: String,
        len: usize,
        sha256: String,
        binding: BindingParams,
    },
    Chunk {
        session_id: Option<String>,
        range: ContentRange,
        len: usize,
        binding: Option<BindingParams>,
    },
    Complete {
        session_id: String,
        sha256: String,
        binding: BindingParams,
    },
    Cancel {
        session_id: String,
    },
    Status {
        session_id: String,
    },
}

/// Server stand-in that acknowledges what it receives.
pub(crate) struct MockTransport {
    session_id: String,
    calls: Mutex<Vec<Call>>,
    received: Mutex<Vec<u8>>,
    fail_chunk: Option<usize>,
    ack_limit: Option<u64>,
    omit_id: bool,
    hang_chunk: Option<(usize, CancellationToken)>,
    cancel_after: Option<(usize, CancellationToken)>,
    server_offset: u64,
    fail_completion: bool,
    fail_cancel: bool,
    response: CompletionResponse,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            session_id: "upload-123".into(),
            calls: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            fail_chunk: None,
            ack_limit: None,
            omit_id: false,
            hang_chunk: None,
            cancel_after: None,
            server_offset: 0,
            fail_completion: false,
            fail_cancel: false,
            response: CompletionResponse {
                message: "created".into(),
                id: Some(ResourceId::Number(42)),
                extra: Default::default(),
            },
        }
    }

    /// Chunk `index` (0-based) fails with a 500.
    pub(crate) fn failing_chunk(mut self, index: usize) -> Self {
        self.fail_chunk = Some(index);
        self
    }

    /// Acknowledge at most `limit` bytes of each chunk.
    pub(crate) fn acking_at_most(mut self, limit: u64) -> Self {
        self.ack_limit = Some(limit);
        self
    }

    /// Acknowledgements carry no session id.
    pub(crate) fn without_session_id(mut self) -> Self {
        self.omit_id = true;
        self
    }

    /// Chunk `index` cancels `token` and never answers.
    pub(crate) fn hanging_on_chunk(mut self, index: usize, token: CancellationToken) -> Self {
        self.hang_chunk = Some((index, token));
        self
    }

    /// Chunk `index` is acknowledged, then `token` is cancelled.
    pub(crate) fn cancelling_after(mut self, index: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((index, token));
        self
    }

    /// Offset reported by a session status query.
    pub(crate) fn with_server_offset(mut self, offset: u64) -> Self {
        self.server_offset = offset;
        self
    }

    pub(crate) fn failing_completion(mut self) -> Self {
        self.fail_completion = true;
        self
    }

    pub(crate) fn failing_cancel(mut self) -> Self {
        self.fail_cancel = true;
        self
    }

    pub(crate) fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn chunk_ranges(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Chunk { range, .. } => Some(range.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Bytes the server acknowledged, in arrival order.
    pub(crate) fn received(&self) -> Vec<u8> {
        self.received.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn chunks_seen(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::Chunk { .. }))
            .count()
    }
}

impl UploadTransport for MockTransport {
    fn upload_whole(&self, req: WholeFileRequest) -> TransportFuture<'_, CompletionResponse> {
        self.record(Call::Whole {
            filename: req.filename.clone(),
            len: req.data.len(),
            sha256: req.sha256.clone(),
            binding: req.binding.clone(),
        });
        Box::pin(async move {
            self.received.lock().unwrap().extend_from_slice(&req.data);
            Ok(self.response.clone())
        })
    }

    fn send_chunk(&self, req: ChunkRequest) -> TransportFuture<'_, ChunkAck> {
        let index = self.chunks_seen();
        self.record(Call::Chunk {
            session_id: req.session_id.clone(),
            range: req.range,
            len: req.data.len(),
            binding: req.binding.clone(),
        });

        Box::pin(async move {
            if let Some((i, token)) = &self.hang_chunk
                && *i == index
            {
                token.cancel();
                std::future::pending::<()>().await;
            }
            if self.fail_chunk == Some(index) {
                return Err(UploadError::Server {
                    status: 500,
                    body: "chunk rejected".into(),
                });
            }

            let len = req.data.len() as u64;
            let acked = self.ack_limit.map_or(len, |limit| limit.min(len));
            self.received
                .lock()
                .unwrap()
                .extend_from_slice(&req.data[..acked as usize]);

            if let Some((i, token)) = &self.cancel_after
                && *i == index
            {
                token.cancel();
            }

            Ok(ChunkAck {
                id: (!self.omit_id).then(|| ResourceId::from(self.session_id.as_str())),
                offset: req.range.start + acked,
                filename: Some(req.filename),
                expires: None,
            })
        })
    }

    fn complete(&self, req: CompletionRequest) -> TransportFuture<'_, CompletionResponse> {
        self.record(Call::Complete {
            session_id: req.session_id.clone(),
            sha256: req.sha256.clone(),
            binding: req.binding.clone(),
        });
        Box::pin(async move {
            if self.fail_completion {
                return Err(UploadError::Server {
                    status: 400,
                    body: "checksum mismatch".into(),
                });
            }
            Ok(self.response.clone())
        })
    }

    fn cancel_session(&self, session: SessionRef) -> TransportFuture<'_, ()> {
        self.record(Call::Cancel {
            session_id: session.session_id,
        });
        Box::pin(async move {
            if self.fail_cancel {
                return Err(UploadError::Transport("connection refused".into()));
            }
            Ok(())
        })
    }

    fn session_status(&self, session: SessionRef) -> TransportFuture<'_, ChunkAck> {
        self.record(Call::Status {
            session_id: session.session_id.clone(),
        });
        Box::pin(async move {
            Ok(ChunkAck {
                id: Some(ResourceId::from(session.session_id.as_str())),
                offset: self.server_offset,
                filename: None,
                expires: None,
            })
        })
    }
}
