//! HTTP transport for labdrop chunked uploads.
//!
//! Implements [`labdrop_upload::UploadTransport`] with `reqwest`: multipart
//! bodies, `Content-Range` headers and bearer token authentication.

pub mod client;
mod transport;

pub use client::{DEFAULT_BASE_URL, HttpError, HttpTransport, HttpTransportConfig};
