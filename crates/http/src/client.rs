//! Upload API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use std::time::Duration;

use labdrop_protocol::{
    BindingParams, ChunkAck, CompletionResponse, ContentRange, FIELD_FILE, FIELD_FILENAME,
    FIELD_SHA256, UploadResource,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Characters escaped in a session id path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Errors from the upload API client.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid token")]
    InvalidToken,

    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// API root; collection segments are appended to it.
    pub base_url: String,
    /// Bearer token. Empty sends no `Authorization` header.
    pub token: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            request_timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// Upload API client.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a client for the given settings.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, HttpError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| HttpError::InvalidUrl(format!("{base_url}: {e}")))?;

        let mut headers = HeaderMap::new();
        if !config.token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", config.token))
                    .map_err(|_| HttpError::InvalidToken)?,
            );
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{resource}/`
    pub fn collection_url(&self, resource: &UploadResource) -> String {
        format!("{}/{}/", self.base_url, resource.path_segment())
    }

    /// `{base}/{resource}/{id}/` with the id percent-encoded.
    pub fn session_url(&self, resource: &UploadResource, session_id: &str) -> String {
        let encoded = utf8_percent_encode(session_id, PATH_SEGMENT);
        format!("{}/{}/{encoded}/", self.base_url, resource.path_segment())
    }

    /// Uploads a whole file in one request.
    pub async fn upload_whole(
        &self,
        resource: &UploadResource,
        filename: &str,
        data: Vec<u8>,
        sha256: &str,
        binding: &BindingParams,
    ) -> Result<CompletionResponse, HttpError> {
        let url = self.collection_url(resource);
        debug!(url = %url, bytes = data.len(), "POST whole file");

        let form = with_binding(file_form(filename, data)?, binding)
            .text(FIELD_SHA256, sha256.to_string());
        let body = self.execute(self.http.post(&url).multipart(form)).await?;
        Ok(CompletionResponse::from_body(&body)?)
    }

    /// Sends one chunk. Without a session id the chunk opens a new session.
    pub async fn send_chunk(
        &self,
        resource: &UploadResource,
        session_id: Option<&str>,
        filename: &str,
        range: ContentRange,
        data: Vec<u8>,
        binding: Option<&BindingParams>,
    ) -> Result<ChunkAck, HttpError> {
        let mut form = file_form(filename, data)?;
        if let Some(binding) = binding {
            form = with_binding(form, binding);
        }

        let request = match session_id {
            Some(id) => {
                let url = self.session_url(resource, id);
                debug!(url = %url, range = %range, "PUT chunk");
                self.http.put(url)
            }
            None => {
                let url = self.collection_url(resource);
                debug!(url = %url, range = %range, "POST first chunk");
                self.http.post(url)
            }
        };

        let body = self
            .execute(request.header(CONTENT_RANGE, range.to_string()).multipart(form))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Completes a session with the whole-file digest.
    pub async fn complete(
        &self,
        resource: &UploadResource,
        session_id: &str,
        sha256: &str,
        binding: &BindingParams,
    ) -> Result<CompletionResponse, HttpError> {
        let url = self.session_url(resource, session_id);
        debug!(url = %url, "POST completion");

        let form = with_binding(Form::new().text(FIELD_SHA256, sha256.to_string()), binding);
        let body = self.execute(self.http.post(&url).multipart(form)).await?;
        Ok(CompletionResponse::from_body(&body)?)
    }

    /// Deletes a session. The response body is ignored.
    pub async fn delete_session(
        &self,
        resource: &UploadResource,
        session_id: &str,
    ) -> Result<(), HttpError> {
        let url = self.session_url(resource, session_id);
        debug!(url = %url, "DELETE session");
        self.execute(self.http.delete(&url)).await?;
        Ok(())
    }

    /// Queries how many bytes the server holds for a session.
    pub async fn session_status(
        &self,
        resource: &UploadResource,
        session_id: &str,
    ) -> Result<ChunkAck, HttpError> {
        let url = self.session_url(resource, session_id);
        debug!(url = %url, "GET session");
        let body = self.execute(self.http.get(&url)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends a request, turning non-2xx statuses into [`HttpError::Api`].
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, HttpError> {
        let resp = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

/// Form with the `file` part and the `filename` field.
fn file_form(filename: &str, data: Vec<u8>) -> Result<Form, HttpError> {
    let part = Part::bytes(data)
        .file_name(filename.to_string())
        .mime_str("application/octet-stream")?;
    Ok(Form::new()
        .part(FIELD_FILE, part)
        .text(FIELD_FILENAME, filename.to_string()))
}

fn with_binding(mut form: Form, binding: &BindingParams) -> Form {
    for (key, value) in binding.iter() {
        form = form.text(key.to_string(), value.to_string());
    }
    form
}
