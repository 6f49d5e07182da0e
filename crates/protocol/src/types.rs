use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::constants::RESERVED_FIELDS;

/// Lifecycle state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    #[serde(rename = "not_started")]
    NotStarted,
    #[serde(rename = "chunk_in_flight")]
    ChunkInFlight,
    #[serde(rename = "finalizing")]
    Finalizing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl UploadStatus {
    /// Returns `true` for states no transition can leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::ChunkInFlight => "chunk_in_flight",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Server collection a file is uploaded into.
///
/// The collection decides what the completion request does with the file
/// (create an annotation, import a metadata table, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum UploadResource {
    /// Generic chunked upload collection.
    #[default]
    ChunkedUpload,
    /// Annotation attached to an instrument.
    InstrumentAnnotation,
    /// Annotation attached to a stored reagent.
    StoredReagentAnnotation,
    /// Metadata table import.
    MetadataTableImport,
    /// Any other collection, by path segment.
    Custom(String),
}

impl UploadResource {
    /// URL path segment for this collection.
    pub fn path_segment(&self) -> &str {
        match self {
            Self::ChunkedUpload => "chunked_upload",
            Self::InstrumentAnnotation => "instrument_annotation_chunked_upload",
            Self::StoredReagentAnnotation => "stored_reagent_annotation_chunked_upload",
            Self::MetadataTableImport => "metadata_table_import_chunked_upload",
            Self::Custom(segment) => segment,
        }
    }
}

impl fmt::Display for UploadResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for UploadResource {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segment = s.trim().trim_matches('/');
        if segment.is_empty() || segment.contains('/') || segment.contains('?') {
            return Err(ProtocolError::InvalidResource(s.to_string()));
        }
        Ok(match segment {
            "chunked_upload" => Self::ChunkedUpload,
            "instrument_annotation_chunked_upload" => Self::InstrumentAnnotation,
            "stored_reagent_annotation_chunked_upload" => Self::StoredReagentAnnotation,
            "metadata_table_import_chunked_upload" => Self::MetadataTableImport,
            other => Self::Custom(other.to_string()),
        })
    }
}

/// Caller-supplied key/value pairs naming the entity a file binds to.
///
/// Order is preserved; the core never interprets the values.
///
/// Deserializing applies the same key checks as [`insert`](Self::insert).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "Vec<(String, String)>",
    try_from = "Vec<(String, String)>"
)]
pub struct BindingParams {
    pairs: Vec<(String, String)>,
}

impl BindingParams {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair, rejecting empty keys and protocol-owned field names.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ProtocolError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ProtocolError::InvalidBinding("empty key".into()));
        }
        if RESERVED_FIELDS.contains(&key.as_str()) {
            return Err(ProtocolError::ReservedField(key));
        }
        self.pairs.push((key, value.into()));
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl ToString,
    ) -> Result<Self, ProtocolError> {
        self.insert(key, value.to_string())?;
        Ok(self)
    }

    /// Parses a `key=value` pair (as given on a command line).
    pub fn parse_pair(pair: &str) -> Result<(String, String), ProtocolError> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| ProtocolError::InvalidBinding(format!("expected key=value: {pair}")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ProtocolError::InvalidBinding(format!("empty key: {pair}")));
        }
        Ok((key.to_string(), value.trim().to_string()))
    }

    /// Returns the first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Builds a set from `(key, value)` pairs, validating each key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (k, v) in pairs {
            params.insert(k, v)?;
        }
        Ok(params)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl TryFrom<Vec<(String, String)>> for BindingParams {
    type Error = ProtocolError;

    fn try_from(pairs: Vec<(String, String)>) -> Result<Self, Self::Error> {
        Self::from_pairs(pairs)
    }
}

impl From<BindingParams> for Vec<(String, String)> {
    fn from(params: BindingParams) -> Self {
        params.pairs
    }
}
