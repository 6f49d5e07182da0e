//! Upload error types.

/// Errors produced by an upload.
///
/// Transport and server failures are carried verbatim; nothing here is
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("upload failed: no session identifier")]
    MissingSessionId,

    #[error("cancelled")]
    Cancelled,

    #[error("transfer error: {0}")]
    Transfer(#[from] labdrop_transfer::TransferError),

    #[error("invalid request: {0}")]
    Request(#[from] labdrop_protocol::ProtocolError),

    #[error("task join error: {0}")]
    Task(String),
}
