//! Upload module
//!
//! Implements the chunked upload protocol: prepare a file id, send the file
//! in fixed-size hashed chunks, finalize the transfer and commit it as a new
//! asset or as a new version of an existing one.

use crate::client::SendError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod chunk;
pub mod metadata;
pub mod uploader;

pub use chunk::{chunk_count, file_digest, ChunkDescriptor, ChunkReader, CHUNK_SIZE};
pub use metadata::{AssetMetadata, CommitTarget, BRAND_ID_KEY, MEDIA_ID_KEY};
pub use uploader::Uploader;

/// Prefix of every error message handed back to callers
pub const ERROR_PREFIX: &str = "Unable to upload file. ";

/// Protocol step, used for error context, span names and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStep {
    Prepare,
    Chunk,
    Finalize,
    Commit,
}

impl UploadStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStep::Prepare => "prepare",
            UploadStep::Chunk => "chunk",
            UploadStep::Finalize => "finalize",
            UploadStep::Commit => "commit",
        }
    }
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single upload
///
/// `Init → Prepared → Uploading → Finalized → Committed`, with `Failed`
/// reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Init,
    Prepared,
    Uploading { sent: u64, total: u64 },
    Finalized,
    Committed,
    Failed,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Init => f.write_str("init"),
            UploadState::Prepared => f.write_str("prepared"),
            UploadState::Uploading { sent, total } => write!(f, "uploading({sent}/{total})"),
            UploadState::Finalized => f.write_str("finalized"),
            UploadState::Committed => f.write_str("committed"),
            UploadState::Failed => f.write_str("failed"),
        }
    }
}

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{step} request failed: {source}")]
    Transport {
        step: UploadStep,
        #[source]
        source: SendError,
    },

    #[error("{0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected {step} response: {reason}")]
    UnexpectedResponse { step: UploadStep, reason: String },

    #[error("Chunk count mismatch: expected {expected}, sent {sent}")]
    ChunkCountMismatch { expected: u64, sent: u64 },

    #[error("Upload aborted after {sent} of {total} chunks")]
    Aborted { sent: u64, total: u64 },
}

impl UploadError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Transport { .. } => "transport",
            UploadError::Validation(_) => "validation",
            UploadError::Io(_) => "io",
            UploadError::UnexpectedResponse { .. } => "unexpected_response",
            UploadError::ChunkCountMismatch { .. } => "chunk_count_mismatch",
            UploadError::Aborted { .. } => "aborted",
        }
    }

    pub(crate) fn transport(step: UploadStep) -> impl FnOnce(SendError) -> Self {
        move |source| UploadError::Transport { step, source }
    }
}

/// Server-issued handle scoping one upload session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate transfer state consumed by finalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub file_id: FileId,
    pub file_name: String,
    pub file_size: u64,
    pub chunk_count: u64,
    pub sha256: String,
}

impl UploadSummary {
    /// Form fields of the finalize request
    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("fileName".to_string(), self.file_name.clone()),
            ("fileSize".to_string(), self.file_size.to_string()),
            ("chunksCount".to_string(), self.chunk_count.to_string()),
            ("sha256".to_string(), self.sha256.clone()),
        ]
    }
}

/// Media item created or updated by a commit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Any further fields reported by the service
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Successful commit payload, shaped by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default)]
    pub mediaitems: Vec<MediaItem>,
    #[serde(rename = "batchId", default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mediaid: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Terminal outcome handed back to callers
///
/// Serializes to the service payload on success, `{"Error": "..."}` on
/// failure and `{"Aborted": "..."}` when the upload was cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadResult {
    Saved(SaveResponse),
    Failed {
        #[serde(rename = "Error")]
        error: String,
    },
    Aborted {
        #[serde(rename = "Aborted")]
        reason: String,
    },
}

impl UploadResult {
    /// True when the service accepted the commit
    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Saved(saved) if saved.success)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, UploadResult::Aborted { .. })
    }

    /// Error message, if this is a failure
    pub fn error_message(&self) -> Option<&str> {
        match self {
            UploadResult::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn saved(&self) -> Option<&SaveResponse> {
        match self {
            UploadResult::Saved(saved) => Some(saved),
            _ => None,
        }
    }
}

impl From<SaveResponse> for UploadResult {
    fn from(saved: SaveResponse) -> Self {
        UploadResult::Saved(saved)
    }
}

impl From<UploadError> for UploadResult {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Aborted { .. } => UploadResult::Aborted {
                reason: err.to_string(),
            },
            _ => UploadResult::Failed {
                error: format!("{}{}", ERROR_PREFIX, err),
            },
        }
    }
}
