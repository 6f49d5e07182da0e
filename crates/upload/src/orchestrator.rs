//! Upload orchestrator for running several files at once.
//!
//! Every job runs as its own sequential upload; jobs proceed concurrently
//! and share one event stream and one cancellation token.

use std::io::{Read, Seek};

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::transport::UploadTransport;
use crate::types::{JobResult, UploadEvent, UploadJob};
use crate::uploader::ChunkedUploader;

/// Orchestrates uploads of one or more files.
pub struct UploadOrchestrator {
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl Default for UploadOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadOrchestrator {
    /// Creates a new orchestrator.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns the token that cancels every running upload.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads every job concurrently. A failed job does not stop the
    /// others. Returns one result per job, in input order.
    pub async fn upload_all<R>(
        &self,
        conn: &dyn UploadTransport,
        jobs: Vec<UploadJob<R>>,
    ) -> Vec<JobResult>
    where
        R: Read + Seek + Send + 'static,
    {
        if jobs.is_empty() {
            return Vec::new();
        }

        join_all(jobs.into_iter().map(|job| self.upload_one(conn, job))).await
    }

    /// Uploads a single job.
    pub async fn upload_one<R>(&self, conn: &dyn UploadTransport, job: UploadJob<R>) -> JobResult
    where
        R: Read + Seek + Send + 'static,
    {
        let filename = job.request.filename.clone();
        let uploader = ChunkedUploader::new(conn, self.cancel.child_token());

        match uploader
            .upload(job.reader, &job.request, &self.events_tx)
            .await
        {
            Ok(outcome) => {
                info!(
                    file = %filename,
                    sha256 = %outcome.sha256,
                    fast_path = outcome.fast_path,
                    "upload job completed"
                );
                JobResult {
                    filename,
                    success: true,
                    error: None,
                    outcome: Some(outcome),
                }
            }
            Err(e) => {
                let err_msg = e.to_string();
                error!(file = %filename, error = %err_msg, "upload job failed");
                JobResult {
                    filename,
                    success: false,
                    error: Some(err_msg),
                    outcome: None,
                }
            }
        }
    }
}
