use labdrop_protocol::{ChunkAck, CompletionResponse};
use labdrop_upload::{
    ChunkRequest, CompletionRequest, SessionRef, TransportFuture, UploadError, UploadTransport,
    WholeFileRequest,
};

use crate::client::{HttpError, HttpTransport};

impl From<HttpError> for UploadError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Api { status, body } => UploadError::Server { status, body },
            HttpError::Json(e) => UploadError::Json(e),
            other => UploadError::Transport(other.to_string()),
        }
    }
}

impl UploadTransport for HttpTransport {
    fn upload_whole(&self, req: WholeFileRequest) -> TransportFuture<'_, CompletionResponse> {
        Box::pin(async move {
            let resp = HttpTransport::upload_whole(
                self,
                &req.resource,
                &req.filename,
                req.data,
                &req.sha256,
                &req.binding,
            )
            .await?;
            Ok(resp)
        })
    }

    fn send_chunk(&self, req: ChunkRequest) -> TransportFuture<'_, ChunkAck> {
        Box::pin(async move {
            let ack = HttpTransport::send_chunk(
                self,
                &req.resource,
                req.session_id.as_deref(),
                &req.filename,
                req.range,
                req.data,
                req.binding.as_ref(),
            )
            .await?;
            Ok(ack)
        })
    }

    fn complete(&self, req: CompletionRequest) -> TransportFuture<'_, CompletionResponse> {
        Box::pin(async move {
            let resp = HttpTransport::complete(
                self,
                &req.resource,
                &req.session_id,
                &req.sha256,
                &req.binding,
            )
            .await?;
            Ok(resp)
        })
    }

    fn cancel_session(&self, session: SessionRef) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.delete_session(&session.resource, &session.session_id)
                .await?;
            Ok(())
        })
    }

    fn session_status(&self, session: SessionRef) -> TransportFuture<'_, ChunkAck> {
        Box::pin(async move {
            let ack =
                HttpTransport::session_status(self, &session.resource, &session.session_id)
                    .await?;
            Ok(ack)
        })
    }
}
