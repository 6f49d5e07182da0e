//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use labdrop_protocol::{BindingParams, ProtocolError, UploadResource};

#[derive(Debug, Parser)]
#[command(name = "labdrop", version)]
#[command(about = "Resumable chunked file upload client", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.config/labdrop/client.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a file
    Upload {
        /// File to upload
        file: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Continue an interrupted chunked upload
    Resume {
        /// File the session was uploading
        file: PathBuf,

        /// Session id reported by the server
        #[arg(long)]
        session: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Delete a server-side upload session
    Cancel {
        /// Session id to delete
        #[arg(long)]
        session: String,

        /// Upload collection
        #[arg(long, default_value = "chunked_upload")]
        resource: UploadResource,
    },
}

/// Where an upload lands and how it is split.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Upload collection (URL path segment)
    #[arg(long, default_value = "chunked_upload")]
    pub resource: UploadResource,

    /// Binding metadata, repeatable
    #[arg(long = "bind", value_name = "KEY=VALUE", value_parser = parse_binding)]
    pub bind: Vec<(String, String)>,

    /// Chunk size in bytes (default: from configuration)
    #[arg(long)]
    pub chunk_size: Option<u64>,
}

impl TargetArgs {
    pub fn binding(&self) -> Result<BindingParams, ProtocolError> {
        BindingParams::from_pairs(self.bind.iter().cloned())
    }
}

fn parse_binding(s: &str) -> Result<(String, String), ProtocolError> {
    BindingParams::parse_pair(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_upload_with_bindings() {
        let cli = Cli::try_parse_from([
            "labdrop",
            "upload",
            "plate.csv",
            "--resource",
            "instrument_annotation_chunked_upload",
            "--bind",
            "instrument=7",
            "--bind",
            "annotation_type=file",
            "--chunk-size",
            "4096",
        ])
        .unwrap();

        let Command::Upload { file, target } = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(file, PathBuf::from("plate.csv"));
        assert_eq!(target.resource, UploadResource::InstrumentAnnotation);
        assert_eq!(target.chunk_size, Some(4096));

        let binding = target.binding().unwrap();
        assert_eq!(binding.get("instrument"), Some("7"));
        assert_eq!(binding.get("annotation_type"), Some("file"));
    }

    #[test]
    fn defaults_to_generic_collection() {
        let cli = Cli::try_parse_from(["labdrop", "upload", "a.bin"]).unwrap();
        let Command::Upload { target, .. } = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(target.resource, UploadResource::ChunkedUpload);
        assert!(target.bind.is_empty());
        assert!(target.chunk_size.is_none());
    }

    #[test]
    fn reserved_binding_key_rejected() {
        let cli = Cli::try_parse_from(["labdrop", "upload", "a.bin", "--bind", "sha256=x"]).unwrap();
        let Command::Upload { target, .. } = cli.command else {
            panic!("expected upload");
        };
        assert!(matches!(
            target.binding(),
            Err(ProtocolError::ReservedField(_))
        ));
    }

    #[test]
    fn malformed_binding_rejected() {
        let result = Cli::try_parse_from(["labdrop", "upload", "a.bin", "--bind", "novalue"]);
        assert!(result.is_err());
    }

    #[test]
    fn resume_requires_session() {
        assert!(Cli::try_parse_from(["labdrop", "resume", "a.bin"]).is_err());

        let cli = Cli::try_parse_from([
            "labdrop",
            "--config",
            "/tmp/c.toml",
            "resume",
            "a.bin",
            "--session",
            "s-1",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Command::Resume { ref session, .. } if session == "s-1"));
    }

    #[test]
    fn parse_cancel() {
        let cli = Cli::try_parse_from([
            "labdrop",
            "cancel",
            "--session",
            "42",
            "--resource",
            "metadata_table_import_chunked_upload",
        ])
        .unwrap();
        let Command::Cancel { session, resource } = cli.command else {
            panic!("expected cancel");
        };
        assert_eq!(session, "42");
        assert_eq!(resource, UploadResource::MetadataTableImport);
    }
}
