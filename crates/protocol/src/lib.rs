//! Wire types for the labdrop chunked upload protocol.
//!
//! Shared by the upload core and its transports: the byte-range header,
//! server acknowledgements, completion payloads and binding metadata.

pub mod constants;
pub mod messages;
pub mod range;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{DEFAULT_CHUNK_SIZE, FIELD_FILE, FIELD_FILENAME, FIELD_SHA256};
pub use messages::{ChunkAck, CompletionResponse, ResourceId};
pub use range::ContentRange;
pub use types::{BindingParams, UploadResource, UploadStatus};

/// Errors produced while building or parsing wire values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid content range: {0}")]
    InvalidContentRange(String),

    #[error("invalid binding parameter: {0}")]
    InvalidBinding(String),

    #[error("binding key {0:?} collides with a reserved form field")]
    ReservedField(String),

    #[error("invalid resource segment: {0:?}")]
    InvalidResource(String),
}
