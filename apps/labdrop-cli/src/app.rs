//! Command execution: wires configuration, transport, uploader and the
//! progress bar together.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use labdrop_http::HttpTransport;
use labdrop_transfer::{ChunkReader, upload_filename};
use labdrop_upload::{ChunkedUploader, UploadError, UploadEvent, UploadOutcome, UploadRequest};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cli::{Command, TargetArgs};
use crate::config::Config;

/// Runs one command until it finishes or Ctrl-C cancels it.
pub async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    let transport = HttpTransport::new(&config.transport_config())?;
    tracing::debug!(base_url = %transport.base_url(), "transport ready");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let uploader = ChunkedUploader::new(&transport, cancel);

    match command {
        Command::Upload { file, target } => {
            let request = build_request(&file, &target, &config)?;
            let reader = ChunkReader::open(&file)?;

            let (tx, rx) = mpsc::channel(256);
            let bar = tokio::spawn(render_progress(rx));
            let result = uploader.upload(reader, &request, &tx).await;
            drop(tx);
            let _ = bar.await;

            report(result)
        }
        Command::Resume {
            file,
            session,
            target,
        } => {
            let request = build_request(&file, &target, &config)?;
            let reader = ChunkReader::open(&file)?;

            let (tx, rx) = mpsc::channel(256);
            let bar = tokio::spawn(render_progress(rx));
            let result = uploader.resume(reader, &request, &session, &tx).await;
            drop(tx);
            let _ = bar.await;

            report(result)
        }
        Command::Cancel { session, resource } => {
            uploader.cancel_session(&resource, &session).await?;
            tracing::info!(session = %session, resource = %resource, "session deleted");
            Ok(())
        }
    }
}

/// Builds the upload request for `file` from the command-line target.
fn build_request(file: &Path, target: &TargetArgs, config: &Config) -> anyhow::Result<UploadRequest> {
    let filename = upload_filename(file)?;
    Ok(UploadRequest::new(target.resource.clone(), filename)
        .with_binding(target.binding()?)
        .with_chunk_size(target.chunk_size.unwrap_or(config.chunk_size)))
}

/// Prints the outcome as JSON on success.
fn report(result: Result<UploadOutcome, UploadError>) -> anyhow::Result<()> {
    match result {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(UploadError::Cancelled) => anyhow::bail!("upload cancelled"),
        Err(e) => Err(e.into()),
    }
}

/// Drives a progress bar from upload events until the channel closes.
async fn render_progress(mut rx: mpsc::Receiver<UploadEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::Started {
                label,
                total_bytes,
                resumed_from,
                ..
            } => {
                let pb = ProgressBar::new(total_bytes);
                pb.set_style(bar_style());
                pb.set_message(label);
                if let Some(offset) = resumed_from {
                    pb.set_position(offset);
                }
                bar = Some(pb);
            }
            UploadEvent::Progress { offset, .. } => {
                if let Some(pb) = &bar {
                    pb.set_position(offset);
                }
            }
            UploadEvent::Completed { label, .. } => {
                if let Some(pb) = bar.take() {
                    pb.set_position(pb.length().unwrap_or(0));
                    pb.finish_with_message(format!("{label} uploaded"));
                }
            }
            UploadEvent::Failed { label, error } => {
                if let Some(pb) = bar.take() {
                    pb.abandon_with_message(format!("{label} failed: {error}"));
                }
            }
            UploadEvent::Cancelled { label } => {
                if let Some(pb) = bar.take() {
                    pb.abandon_with_message(format!("{label} cancelled"));
                }
            }
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=>-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use labdrop_protocol::UploadResource;
    use std::io::Write;

    fn target(bind: &[(&str, &str)], chunk_size: Option<u64>) -> TargetArgs {
        TargetArgs {
            resource: UploadResource::StoredReagentAnnotation,
            bind: bind
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            chunk_size,
        }
    }

    #[test]
    fn request_uses_file_name_and_config_chunk_size() {
        let config = Config {
            chunk_size: 2048,
            ..Config::default()
        };
        let req = build_request(
            Path::new("/data/run-7/plate.csv"),
            &target(&[("stored_reagent", "12")], None),
            &config,
        )
        .unwrap();

        assert_eq!(req.filename, "plate.csv");
        assert_eq!(req.resource, UploadResource::StoredReagentAnnotation);
        assert_eq!(req.chunk_size, 2048);
        assert_eq!(req.binding.get("stored_reagent"), Some("12"));
    }

    #[test]
    fn command_line_chunk_size_wins() {
        let req = build_request(
            Path::new("plate.csv"),
            &target(&[], Some(512)),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(req.chunk_size, 512);
    }

    #[test]
    fn reserved_binding_fails_request() {
        let result = build_request(
            Path::new("plate.csv"),
            &target(&[("filename", "x")], None),
            &Config::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn cancelled_upload_is_an_error() {
        let err = report(Err(UploadError::Cancelled)).unwrap_err();
        assert_eq!(err.to_string(), "upload cancelled");
    }

    #[tokio::test]
    async fn progress_renderer_drains_events() {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(render_progress(rx));

        tx.send(UploadEvent::Started {
            label: "a.bin".into(),
            total_bytes: 20,
            fast_path: false,
            resumed_from: Some(5),
        })
        .await
        .unwrap();
        tx.send(UploadEvent::Progress {
            label: "a.bin".into(),
            percent: 50.0,
            offset: 10,
            total: 20,
        })
        .await
        .unwrap();
        tx.send(UploadEvent::Completed {
            label: "a.bin".into(),
            sha256: "00".into(),
            resource_id: None,
        })
        .await
        .unwrap();
        drop(tx);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_fails_before_network() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"x").unwrap();
        let missing = file.path().with_extension("gone");

        let config = Config {
            base_url: "http://127.0.0.1:9".into(),
            ..Config::default()
        };
        let command = Command::Upload {
            file: missing,
            target: target(&[], None),
        };
        assert!(run(command, config).await.is_err());
    }
}
