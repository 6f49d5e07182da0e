//! Resumable chunked upload flow.
//!
//! This crate implements the **client side** of the chunked upload
//! protocol. It has no HTTP dependency: callers provide an
//! [`UploadTransport`] (see `labdrop-http`) and receive progress through
//! an event channel.
//!
//! # Flow
//!
//! 1. **Plan**: files at or below one chunk take the fast path
//! 2. **Chunks**: slice, send with a `Content-Range`, adopt the server's offset
//! 3. **Hash**: acknowledged bytes feed one ordered SHA-256 accumulator
//! 4. **Complete**: send the digest plus binding metadata, get the created object
//!
//! Cancellation is a `CancellationToken` raced against every in-flight
//! request; an open session is deleted on cancel.

pub mod error;
pub mod orchestrator;
pub mod transport;
pub mod types;
pub mod uploader;

#[cfg(test)]
pub(crate) mod mock;

// Re-export primary types for convenience.
pub use error::UploadError;
pub use orchestrator::UploadOrchestrator;
pub use transport::{
    ChunkRequest, CompletionRequest, SessionRef, TransportFuture, UploadTransport,
    WholeFileRequest,
};
pub use types::{JobResult, ResumePoint, UploadEvent, UploadJob, UploadOutcome, UploadRequest};
pub use uploader::ChunkedUploader;
