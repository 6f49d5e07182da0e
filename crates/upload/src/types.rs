//! Data types for the upload flow.

use std::io::{Read, Seek};

use serde::Serialize;

use labdrop_protocol::{BindingParams, CompletionResponse, ResourceId, UploadResource};
use labdrop_transfer::ChunkReader;

/// What to upload and where it lands.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub resource: UploadResource,
    pub filename: String,
    pub binding: BindingParams,
    /// Maximum chunk length in bytes. `0` selects the default.
    pub chunk_size: u64,
}

impl UploadRequest {
    pub fn new(resource: UploadResource, filename: impl Into<String>) -> Self {
        Self {
            resource,
            filename: filename.into(),
            binding: BindingParams::new(),
            chunk_size: 0,
        }
    }

    pub fn with_binding(mut self, binding: BindingParams) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// A server-side session to continue, with the offset it already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub session_id: String,
    pub offset: u64,
}

/// Progress event emitted during an upload.
///
/// `label` is the upload's file name.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Upload planned and about to send.
    Started {
        label: String,
        total_bytes: u64,
        fast_path: bool,
        resumed_from: Option<u64>,
    },
    /// A chunk was acknowledged.
    Progress {
        label: String,
        percent: f64,
        offset: u64,
        total: u64,
    },
    /// The server created the object.
    Completed {
        label: String,
        sha256: String,
        resource_id: Option<ResourceId>,
    },
    /// The upload failed.
    Failed { label: String, error: String },
    /// The upload was cancelled.
    Cancelled { label: String },
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    /// Hex SHA-256 of the whole file as sent to the server.
    pub sha256: String,
    /// Session used; `None` on the fast path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub chunks_sent: u64,
    pub fast_path: bool,
    pub response: CompletionResponse,
}

/// One file handed to the orchestrator.
pub struct UploadJob<R = std::fs::File> {
    pub reader: ChunkReader<R>,
    pub request: UploadRequest,
}

impl<R: Read + Seek> UploadJob<R> {
    pub fn new(reader: ChunkReader<R>, request: UploadRequest) -> Self {
        Self { reader, request }
    }
}

/// Result of a single upload run by the orchestrator.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub filename: String,
    pub success: bool,
    pub error: Option<String>,
    pub outcome: Option<UploadOutcome>,
}
