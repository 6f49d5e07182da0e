//! Transport trait and the requests the upload flow issues.
//!
//! `UploadTransport` is implemented over HTTP by `labdrop-http`. Keeping
//! it a trait keeps the sequencing logic testable with mocks.

use std::future::Future;
use std::pin::Pin;

use labdrop_protocol::{BindingParams, ChunkAck, CompletionResponse, ContentRange, UploadResource};

use crate::error::UploadError;

/// Boxed future returned by transport methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// Addresses an existing server-side session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    pub resource: UploadResource,
    pub session_id: String,
}

/// Whole file in one request (fast path). No range header, no session.
#[derive(Debug, Clone)]
pub struct WholeFileRequest {
    pub resource: UploadResource,
    pub filename: String,
    pub data: Vec<u8>,
    pub sha256: String,
    pub binding: BindingParams,
}

/// One chunk of a session.
///
/// `session_id` is `None` only for the first chunk, which creates the
/// session; binding metadata rides along on that first request.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub resource: UploadResource,
    pub session_id: Option<String>,
    pub filename: String,
    pub range: ContentRange,
    pub data: Vec<u8>,
    pub binding: Option<BindingParams>,
}

/// Final digest plus binding metadata for a fully acknowledged session.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub resource: UploadResource,
    pub session_id: String,
    pub sha256: String,
    pub binding: BindingParams,
}

/// Abstract connection to the upload collections of a server.
pub trait UploadTransport: Send + Sync {
    /// `POST /{resource}/` with the whole file and its digest.
    fn upload_whole(&self, req: WholeFileRequest) -> TransportFuture<'_, CompletionResponse>;

    /// `POST /{resource}/` (first chunk) or `PUT /{resource}/{id}/`.
    fn send_chunk(&self, req: ChunkRequest) -> TransportFuture<'_, ChunkAck>;

    /// `POST /{resource}/{id}/` with the digest.
    fn complete(&self, req: CompletionRequest) -> TransportFuture<'_, CompletionResponse>;

    /// `DELETE /{resource}/{id}/`.
    fn cancel_session(&self, session: SessionRef) -> TransportFuture<'_, ()>;

    /// `GET /{resource}/{id}/`: the server's current offset for a session.
    fn session_status(&self, session: SessionRef) -> TransportFuture<'_, ChunkAck>;
}
